use owo_colors::{OwoColorize, Style as OwoStyle};

use crate::device::PowerLevel;
use crate::target::Target;

const UNKNOWN: &str = "-";

/// Applies colour and style to terminal text.
#[derive(Debug)]
pub(crate) struct Painter {
    use_colour: bool,
}

impl Painter {
    pub(crate) fn new(use_colour: bool) -> Self {
        Self { use_colour }
    }

    pub(crate) fn heading<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold().cyan())
    }

    pub(crate) fn success<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold().green())
    }

    pub(crate) fn warning<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold().yellow())
    }

    pub(crate) fn muted<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().dimmed())
    }

    pub(crate) fn value<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold())
    }

    pub(crate) fn target(&self, target: Target) -> String {
        self.value(target.to_string())
    }

    /// Something the device did not report, shown as a muted `-`.
    pub(crate) fn or_unknown(&self, value: Option<String>) -> String {
        value.unwrap_or_else(|| self.muted(UNKNOWN))
    }

    /// `on` in the success style, `off` muted, anything else as a raw level.
    pub(crate) fn power(&self, level: PowerLevel) -> String {
        match level {
            PowerLevel::ON => self.success("on"),
            PowerLevel::OFF => self.muted("off"),
            other => self.value(other.value().to_string()),
        }
    }

    fn paint(&self, text: &str, style: OwoStyle) -> String {
        if self.use_colour {
            format!("{}", text.style(style))
        } else {
            text.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn target() -> Target {
        "d0:73:d5:01:02:03".parse().expect("target parses")
    }

    #[test]
    fn plain_output_is_unstyled() {
        let painter = Painter::new(false);

        assert_eq!("Found 2 device(s)", painter.heading("Found 2 device(s)"));
        assert_eq!("No devices answered.", painter.warning("No devices answered."));
        assert_eq!("d0:73:d5:01:02:03", painter.target(target()));
        assert_eq!("-", painter.or_unknown(None));
        assert_eq!("Kitchen", painter.or_unknown(Some("Kitchen".to_owned())));
    }

    #[test]
    fn coloured_output_wraps_the_text() {
        let painter = Painter::new(true);

        for (styled, text) in [
            (painter.heading("Board 16x8"), "Board 16x8"),
            (painter.success("✓"), "✓"),
            (painter.muted("..##"), "..##"),
            (painter.target(target()), "d0:73:d5:01:02:03"),
            (painter.or_unknown(None), "-"),
        ] {
            assert_ne!(text, styled);
            assert!(styled.contains(text), "{styled:?} should contain {text:?}");
        }
        assert_eq!("Kitchen", painter.or_unknown(Some("Kitchen".to_owned())));
    }

    #[rstest]
    #[case::on(PowerLevel::ON, "on")]
    #[case::off(PowerLevel::OFF, "off")]
    #[case::partial(PowerLevel::from(32768), "32768")]
    fn power_names_the_two_wire_levels(#[case] level: PowerLevel, #[case] expected: &str) {
        assert_eq!(expected, Painter::new(false).power(level));
    }
}
