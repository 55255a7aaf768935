//! Interpreter version pinning

use std::fmt;
use std::str::FromStr;

/// `major.minor[.patch]` version as reported by the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PythonVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl PythonVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// True if `self` is at least `minimum`
    pub fn satisfies(&self, minimum: &PythonVersion) -> bool {
        self >= minimum
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for PythonVersion {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim().trim_start_matches("Python").trim();
        let mut parts = trimmed.split('.');

        let mut next = |name: &str, required: bool| -> Result<u32, String> {
            match parts.next() {
                // tolerate suffixes such as "12rc1" or "0+"
                Some(part) => {
                    let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
                    digits
                        .parse::<u32>()
                        .map_err(|_| format!("invalid {} component in `{}`", name, input))
                }
                None if required => Err(format!("missing {} component in `{}`", name, input)),
                None => Ok(0),
            }
        };

        let major = next("major", true)?;
        let minor = next("minor", true)?;
        let patch = next("patch", false)?;
        Ok(Self::new(major, minor, patch))
    }
}
