//! Diagnostic commands issued to a device.
//!
//! Output filters (`| include ...`) are deliberately not used; several
//! fleet models mangle piped commands on a PTY, so filtering happens on
//! this side via the reply grammars.

/// Version/uptime diagnostic.
pub const SHOW_VERSION: &str = "show version";

/// Interface status enumeration.
pub const SHOW_INTERFACE_STATUS: &str = "show int status";

/// Per-interface detail for the named interface.
pub fn show_interface(interface: &str) -> String {
    format!("show int {interface}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_interface_formatting() {
        assert_eq!(show_interface("gi1/0/2"), "show int gi1/0/2");
    }
}
