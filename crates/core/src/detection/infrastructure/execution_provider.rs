use ort::execution_providers::{CPUExecutionProvider, ExecutionProviderDispatch};

/// Execution providers to register on every cascade session, most preferred
/// first.
///
/// The platform accelerator comes first where the build enables one; the CPU
/// provider always closes the list so sessions still load without it.
pub fn preferred_execution_providers() -> Vec<ExecutionProviderDispatch> {
    let mut providers = Vec::with_capacity(2);
    #[cfg(target_os = "macos")]
    providers.push(ort::execution_providers::CoreMLExecutionProvider::default().build());
    #[cfg(target_os = "windows")]
    providers.push(ort::execution_providers::DirectMLExecutionProvider::default().build());
    providers.push(CPUExecutionProvider::default().build());
    providers
}
