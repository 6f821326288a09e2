use crate::sources::TrackRef;

/// How many upcoming titles a queue listing carries.
pub const LISTING_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    /// Nada que hacer (pausar sin música, saltar con la cola vacía...). No es un error.
    NoOp,
    Error,
}

/// Resultado de un comando, listo para renderizar.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    pub status: Status,
    pub message: String,
    pub listing: Option<QueueListing>,
}

impl CommandOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self::with_status(Status::Ok, message)
    }

    pub fn no_op(message: impl Into<String>) -> Self {
        Self::with_status(Status::NoOp, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_status(Status::Error, message)
    }

    pub fn with_listing(mut self, listing: QueueListing) -> Self {
        self.listing = Some(listing);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    fn with_status(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            listing: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueueListing {
    pub current: Option<TrackRef>,
    pub upcoming: Vec<TrackRef>,
    pub remaining: usize,
}
