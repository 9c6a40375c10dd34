//! Loader configuration.
//!
//! Paths, provisioning granularity and the scratch value handed to hosted
//! images.

/// Page size on every target this loader supports.
pub const DEFAULT_GRANULARITY: u64 = 4096;

/// Upper bound on the size of a kernel file read from the boot volume.
pub const DEFAULT_MAX_KERNEL_SIZE: usize = 64 * 1024 * 1024;

/// Loader configuration.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Kernel path on the boot volume.
    pub kernel_path: &'static str,
    /// Optional PSF1 font path; `None` skips the font read.
    pub font_path: Option<&'static str>,
    /// Allocation granularity used to round segment ranges.
    pub granularity: u64,
    /// Value behind the scratch pointer passed to hosted entry points.
    pub scratch_value: i32,
    /// Kernel files larger than this are refused.
    pub max_kernel_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            kernel_path: "kernel",
            font_path: Some("default-font.psf"),
            granularity: DEFAULT_GRANULARITY,
            scratch_value: 1,
            max_kernel_size: DEFAULT_MAX_KERNEL_SIZE,
        }
    }
}

impl LoaderConfig {
    /// Config for a kernel booted without a console font.
    pub fn without_font() -> Self {
        Self {
            font_path: None,
            ..Default::default()
        }
    }

    /// Set the kernel path.
    pub fn kernel(mut self, path: &'static str) -> Self {
        self.kernel_path = path;
        self
    }

    /// Set the font path.
    pub fn font(mut self, path: &'static str) -> Self {
        self.font_path = Some(path);
        self
    }

    /// Set the allocation granularity. Non power-of-two values fall back to
    /// the default page size.
    pub fn granularity(mut self, bytes: u64) -> Self {
        self.granularity = if bytes.is_power_of_two() {
            bytes
        } else {
            DEFAULT_GRANULARITY
        };
        self
    }

    /// Set the scratch value.
    pub fn scratch(mut self, value: i32) -> Self {
        self.scratch_value = value;
        self
    }
}
