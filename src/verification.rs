use crate::Expectation;
use log::error;

/// The sink failures are reported to by [`MockServer::assert`] and [`assert_all`].
///
/// `Vec<String>` implements `Reporter`, which makes it easy to inspect failures in your
/// own assertions. [`LogReporter`] forwards them to the `log` facade instead.
///
/// [`MockServer::assert`]: crate::MockServer::assert
/// [`assert_all`]: crate::assert_all
pub trait Reporter {
    /// Record one failure message.
    fn report(&mut self, message: String);

    /// Called on entry of every asserting function, so reporters that track the location of
    /// failures can skip the frames belonging to this crate.
    fn mark_helper(&mut self) {}
}

impl Reporter for Vec<String> {
    fn report(&mut self, message: String) {
        self.push(message);
    }
}

/// Logs every failure at `error` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&mut self, message: String) {
        error!("{}", message);
    }
}

/// How an [`Expectation`] ended up once the traffic is over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum VerificationReport {
    Satisfied,
    /// Fewer calls than expected were received.
    MissingCalls(i64),
    /// More calls than expected were received, or the calls were not expected at all.
    UnexpectedCalls(i64),
}

impl VerificationReport {
    pub(crate) fn for_expectation(expectation: &Expectation) -> Self {
        let remaining = expectation.remaining_calls();
        if remaining > 0 {
            VerificationReport::MissingCalls(remaining)
        } else if remaining < 0 {
            VerificationReport::UnexpectedCalls(-remaining)
        } else {
            VerificationReport::Satisfied
        }
    }

    pub(crate) fn error_message(
        &self,
        server_name: &str,
        expectation: &Expectation,
    ) -> Option<String> {
        match self {
            VerificationReport::Satisfied => None,
            VerificationReport::MissingCalls(n) => Some(format!(
                "Server({}) expected ({}) more calls to {} {}",
                server_name,
                n,
                expectation.method(),
                expectation.path_prefix()
            )),
            VerificationReport::UnexpectedCalls(n) => Some(format!(
                "Server({}) got ({}) unexpected calls to {} {}",
                server_name,
                n,
                expectation.method(),
                expectation.path_prefix()
            )),
        }
    }
}
