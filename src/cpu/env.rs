use super::CpuConfig;

/// Declare a reader for one `H6280_*` override. The variable is read and
/// parsed once per process; a value that fails to parse counts as unset.
macro_rules! env_setting {
    ($name:ident, $var:expr, $ty:ty, $parse:path) => {
        #[inline]
        pub(crate) fn $name() -> Option<$ty> {
            use std::sync::OnceLock;
            static SETTING: OnceLock<Option<$ty>> = OnceLock::new();
            *SETTING.get_or_init(|| std::env::var($var).ok().and_then(|raw| $parse(raw.trim())))
        }
    };
}

/// `"0"` switches a feature off, anything else switches it on.
pub(crate) fn parse_switch(raw: &str) -> Option<bool> {
    Some(raw != "0")
}

/// Decimal, or hex with a `0x` prefix.
pub(crate) fn parse_number(raw: &str) -> Option<u32> {
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

impl CpuConfig {
    env_setting!(env_debug, "H6280_DEBUG", bool, parse_switch);
    env_setting!(env_stall_guard, "H6280_STALL_GUARD", bool, parse_switch);
    env_setting!(env_clock_hz, "H6280_CLOCK_HZ", u32, parse_number);
    env_setting!(env_timer_io_base, "H6280_TIMER_BASE", u32, parse_number);
    env_setting!(env_irq_io_base, "H6280_IRQ_BASE", u32, parse_number);
}
