//! Setup diagnostics sink.
//!
//! Setup code reports fully formatted failure messages here before aborting.

/// Receives human-readable setup failure messages.
pub trait Diagnostics {
    fn report(&mut self, message: &str);
}

/// Forwards reports to the `log` facade at error level.
#[derive(Debug, Default, Copy, Clone)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn report(&mut self, message: &str) {
        log::error!("{message}");
    }
}

/// Keeps reports in memory.
#[derive(Debug, Default, Clone)]
pub struct CollectDiagnostics {
    messages: Vec<String>,
}

impl CollectDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Diagnostics for CollectDiagnostics {
    fn report(&mut self, message: &str) {
        self.messages.push(message.to_owned());
    }
}

impl<D: Diagnostics + ?Sized> Diagnostics for &mut D {
    fn report(&mut self, message: &str) {
        (**self).report(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_twice(sink: &mut dyn Diagnostics) {
        sink.report("first");
        sink.report("second");
    }

    #[test]
    fn collector_keeps_reports_in_order() {
        let mut sink = CollectDiagnostics::new();
        assert!(sink.is_empty());
        report_twice(&mut sink);
        assert_eq!(sink.messages(), ["first", "second"]);
    }

    fn report_owned<D: Diagnostics>(mut sink: D) {
        sink.report("via reference");
    }

    #[test]
    fn mutable_reference_forwards() {
        let mut sink = CollectDiagnostics::new();
        report_owned(&mut sink);
        assert_eq!(sink.messages(), ["via reference"]);
    }
}
