use std::time::Duration;

/// Failure reported by a transport client.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
  #[error("request failed: {0}")]
  Request(String),

  #[error("resource already exists: {0}")]
  AlreadyExists(String),

  #[error(transparent)]
  Http(#[from] reqwest::Error),
}

/// Errors raised by trigger operations.
///
/// Transport failures during a synchronous invocation do not appear here;
/// they are recorded on the returned result instead.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
  /// A transport failed where no result exists yet to record it.
  #[error("transport failure: {0}")]
  Transport(#[from] TransportError),

  /// The trigger needs a client that was not configured.
  #[error("no {0} client configured")]
  MissingTransport(&'static str),

  /// A polling wait passed its deadline.
  #[error("no result after {waited:?}")]
  Timeout { waited: Duration },

  #[error("invocation cancelled")]
  Cancelled,

  #[error("invalid trigger record: {0}")]
  InvalidRecord(String),

  /// Creating a trigger's queue or container failed.
  #[error("failed to provision {resource}")]
  Provisioning {
    resource: String,
    #[source]
    source: TransportError,
  },

  /// The scheduler no longer accepts work.
  #[error("scheduler is shut down")]
  SchedulerClosed,

  /// The worker running an invocation panicked.
  #[error("invocation task failed: {0}")]
  Join(String),
}
