use std::ffi::OsStr;

use crate::asm::AsmOptions;

/// Settings gathered from the environment and the command line.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct Config {
    /// Reject programs whose instructions run into the variable region
    pub strict: bool,
    /// Plain, colourless output
    pub minimal: bool,
}

impl Config {
    /// `MIC1_STRICT=1` and `MIC1_MINIMAL=1` switch the matching setting on.
    pub fn from_env() -> Self {
        Config {
            strict: var_is("MIC1_STRICT", "1"),
            minimal: var_is("MIC1_MINIMAL", "1"),
        }
    }

    /// Command line flags can only switch settings on.
    pub fn with_flags(self, strict: bool, minimal: bool) -> Self {
        Config {
            strict: self.strict || strict,
            minimal: self.minimal || minimal,
        }
    }

    pub fn asm_options(&self) -> AsmOptions {
        AsmOptions {
            strict: self.strict,
        }
    }
}

fn var_is(name: impl AsRef<OsStr>, value: impl AsRef<str>) -> bool {
    std::env::var(name.as_ref()).is_ok_and(|v| v == value.as_ref())
}
