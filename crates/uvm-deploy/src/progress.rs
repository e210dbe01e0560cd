//! Progress reporting from deployers.

/// One unit of deployer-reported status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressEvent {
    pub stage: String,
    pub message: String,
    /// 0-100; renderers clamp
    pub percent: f64,
    /// Shell command being run, shown for context
    pub command: Option<String>,
    pub detail: Option<String>,
    pub is_error: bool,
}

impl ProgressEvent {
    pub fn new(stage: &str, message: impl Into<String>, percent: f64) -> Self {
        Self {
            stage: stage.to_string(),
            message: message.into(),
            percent,
            ..Default::default()
        }
    }

    pub fn error(stage: &str, message: impl Into<String>, percent: f64) -> Self {
        Self {
            is_error: true,
            ..Self::new(stage, message, percent)
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Percent clamped into 0..=100 for gauges.
    pub fn clamped_percent(&self) -> u16 {
        if self.percent.is_nan() {
            return 0;
        }
        self.percent.round().clamp(0.0, 100.0) as u16
    }
}

/// Callback deployers invoke synchronously at each milestone.
pub type ProgressCallback<'a> = &'a mut dyn FnMut(ProgressEvent);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_clamped() {
        assert_eq!(ProgressEvent::new("s", "m", 140.0).clamped_percent(), 100);
        assert_eq!(ProgressEvent::new("s", "m", -3.0).clamped_percent(), 0);
        assert_eq!(ProgressEvent::new("s", "m", 54.6).clamped_percent(), 55);
        assert_eq!(ProgressEvent::new("s", "m", f64::NAN).clamped_percent(), 0);
    }

    #[test]
    fn builders_fill_optional_fields() {
        let event = ProgressEvent::error("launch", "failed", 40.0)
            .with_command("multipass launch")
            .with_detail("exit 2");
        assert!(event.is_error);
        assert_eq!(event.command.as_deref(), Some("multipass launch"));
        assert_eq!(event.detail.as_deref(), Some("exit 2"));
    }
}
