pub const PNET_MODEL_NAME: &str = "pnet.onnx";
pub const RNET_MODEL_NAME: &str = "rnet.onnx";
pub const ONET_MODEL_NAME: &str = "onet.onnx";

/// Environment variable naming a base URL the models can be downloaded from.
pub const MODEL_URL_ENV: &str = "MTCNN_MODEL_URL";

/// Receptive field of the proposal network, in pixels.
pub const CELL_SIZE: u32 = 12;

/// Output stride of the proposal network.
pub const PROPOSAL_STRIDE: u32 = 2;

pub const REFINE_INPUT_SIZE: u32 = 24;
pub const OUTPUT_INPUT_SIZE: u32 = 48;

pub const PIXEL_MEAN: f32 = 127.5;
pub const PIXEL_SCALE: f32 = 0.0078125;

/// NMS thresholds per stage. The final stage uses the `Min` overlap metric.
pub const PROPOSAL_SCALE_NMS: f64 = 0.5;
pub const PROPOSAL_GLOBAL_NMS: f64 = 0.7;
pub const REFINE_NMS: f64 = 0.7;
pub const OUTPUT_NMS: f64 = 0.7;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
