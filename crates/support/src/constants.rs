pub const VALID_REGEX: &str = "regex should be valid ";
pub const CLOCK_AFTER_EPOCH: &str = "system clock should be after the unix epoch ";

pub const THIS_IS_A_BUG: &str =
    "- this is a bug please report it: https://github.com/trogdor-rs/trogdor/issues";
