/// Target-specific lowering constants. The generator is parameterized by a
/// profile at the type level.
pub trait Profile {
    const NAME: &str;

    /// Whether the entry point brings up the serial line and `render` writes
    /// text to it, instead of formatting through `printf`.
    const SERIAL_OUTPUT: bool;
}

impl Profile for Hosted {
    const NAME: &str = "hosted";

    const SERIAL_OUTPUT: bool = false;
}

impl Profile for Embedded {
    const NAME: &str = "embedded";

    const SERIAL_OUTPUT: bool = true;
}

pub struct Hosted;

pub struct Embedded;

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::codegen::Target;

    #[test]
    fn profiles_match_their_targets() {
        assert_eq!(Hosted::NAME, Target::Hosted.name());
        assert_eq!(Embedded::NAME, Target::Embedded.name());
        assert!(!Hosted::SERIAL_OUTPUT);
        assert!(Embedded::SERIAL_OUTPUT);
    }
}
