use std::io;

use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("bencode error: {source}"))]
    Bencode { source: super::Error },
    #[snafu(display("bencode io error: {source}"))]
    Io { source: io::Error },
}

impl From<super::Error> for Error {
    fn from(source: super::Error) -> Self {
        Self::Bencode { source }
    }
}

impl Error {
    pub fn to_bencode(&self) -> Option<&super::Error> {
        match self {
            Self::Bencode { source } => Some(source),
            Self::Io { .. } => None,
        }
    }

    pub fn is_incomplete(&self) -> bool {
        self.to_bencode().is_some_and(super::Error::is_incomplete)
    }
}
