//! VM Configuration
//!
//! Defines runtime limits for the Vesper virtual machine.
//! Configuration specifies constraints only; enforcement is handled by the
//! loader (frame sizes) and the VM (call depth).

/// VM Configuration
#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Maximum call depth (recursion limit)
    pub max_call_depth: usize,

    /// Maximum number of local variables per function
    pub max_locals: usize,

    /// Maximum number of temporary registers per function
    pub max_registers: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_call_depth: 256,
            max_locals: 4096,
            max_registers: 4096,
        }
    }
}

impl VmConfig {
    /// Create a new configuration with default limits
    pub fn new() -> Self {
        Self::default()
    }
}

/// Compiler switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    /// Print the lowered program to stdout after a successful compilation.
    pub trace: bool,
}
