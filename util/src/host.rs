//! Host platform utility functions

use std::path::PathBuf;
use uname;

/// Environment variable pointing at the root of the software checkout.
pub const SW_ROOT_ENV_VAR: &str = "TRACK_DRIVE_SW_ROOT";

/// Get the root directory of the software, which contains the `params` and `sessions`
/// directories.
pub fn get_sw_root() -> Result<PathBuf, std::env::VarError> {
    std::env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}

/// Get the platform information of the host.
pub fn get_uname() -> std::io::Result<uname::Info> {
    uname::uname()
}

/// Get the network name of the machine the executable is running on.
pub fn get_hostname() -> std::io::Result<String> {
    Ok(get_uname()?.nodename)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_hostname_matches_uname() {
        let info = get_uname().unwrap();
        assert!(!info.sysname.is_empty());
        assert_eq!(get_hostname().unwrap(), info.nodename);
    }
}
