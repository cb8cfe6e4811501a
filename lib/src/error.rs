use std::{fmt, io};
use std::panic::Location;
use std::error::Error as StdError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A build error: a message, optional key/value context, and the chain of
/// errors behind it.
#[derive(Debug)]
pub struct Error {
    message: String,
    context: Vec<(Option<String>, String)>,
    prev: Option<Box<Error>>,
    location: &'static Location<'static>,
}

impl Error {
    #[track_caller]
    pub fn new<M: fmt::Display>(message: M) -> Self {
        Error {
            message: message.to_string(),
            context: vec![],
            prev: None,
            location: Location::caller(),
        }
    }

    /// Attach a `key: value` context line.
    pub fn context<K: fmt::Display, V: fmt::Display>(&mut self, key: K, value: V) {
        self.context.push((Some(key.to_string()), value.to_string()));
    }

    /// Attach a bare context line.
    pub fn note<V: fmt::Display>(&mut self, note: V) {
        self.context.push((None, note.to_string()));
    }

    /// Record `self` as the cause behind `outer`, returning `outer`.
    pub fn chain(self, mut outer: Error) -> Error {
        fn tail(error: &mut Error) -> &mut Error {
            match error.prev {
                Some(ref mut prev) => tail(prev),
                None => error,
            }
        }

        tail(&mut outer).prev = Some(Box::new(self));
        outer
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn render(error: &Error, depth: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let pad = "    ".repeat(depth);
            writeln!(f, "{pad}{}", error.message)?;
            for (key, value) in &error.context {
                match key {
                    Some(key) => writeln!(f, "{pad}{key}: {value}")?,
                    None => writeln!(f, "{pad}{value}")?,
                }
            }

            if std::env::var_os("RUST_BACKTRACE").is_some() {
                writeln!(f, "{pad}[{}]", error.location)?;
            }

            match &error.prev {
                Some(prev) => render(prev, depth + 1, f),
                None => Ok(()),
            }
        }

        render(self, 0, f)
    }
}

impl From<String> for Error {
    #[track_caller]
    fn from(message: String) -> Self {
        Error::new(message)
    }
}

impl From<&str> for Error {
    #[track_caller]
    fn from(message: &str) -> Self {
        Error::new(message)
    }
}

macro_rules! impl_from_std_error {
    ($($T:ty),* $(,)?) => ($(
        impl From<$T> for Error {
            #[track_caller]
            fn from(error: $T) -> Self {
                let mut e = Error::new(&error);
                let mut source = StdError::source(&error);
                while let Some(cause) = source {
                    e.note(cause);
                    source = cause.source();
                }

                e
            }
        }
    )*)
}

impl_from_std_error! {
    io::Error,
    toml::de::Error,
    serde_json::Error,
    jwalk::Error,
    notify::Error,
    minijinja::Error,
    globset::Error,
    std::str::Utf8Error,
}

#[cfg(feature = "sass")]
impl_from_std_error!(Box<grass::Error>);

#[doc(hidden)]
#[macro_export]
macro_rules! err {
    ($($token:tt)*) => (Err($crate::error!($($token)*)));
}

#[doc(hidden)]
#[macro_export]
macro_rules! error {
    ($msg:expr $(, $($rest:tt)*)?) => ({
        #[allow(unused_mut)]
        let mut e = $crate::error::Error::new($msg);
        $($crate::error!(@ctx e $($rest)*);)?
        e
    });

    (@ctx $e:ident $key:expr => $value:expr, $($rest:tt)*) => {
        $e.context($key, $value);
        $crate::error!(@ctx $e $($rest)*);
    };

    (@ctx $e:ident $key:expr => $value:expr) => {
        $e.context($key, $value);
    };

    (@ctx $e:ident $value:expr, $($rest:tt)*) => {
        $e.note($value);
        $crate::error!(@ctx $e $($rest)*);
    };

    (@ctx $e:ident $value:expr) => {
        $e.note($value);
    };

    (@ctx $e:ident) => { };
}

pub trait Chainable<T> {
    fn chain(self, outer: impl Into<Error>) -> Result<T>;

    fn chain_with<F, E>(self, f: F) -> Result<T>
        where F: FnOnce() -> E, E: Into<Error>;
}

impl<T, E: Into<Error>> Chainable<T> for Result<T, E> {
    #[track_caller]
    fn chain(self, outer: impl Into<Error>) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().chain(outer.into())),
        }
    }

    fn chain_with<F, O>(self, f: F) -> Result<T>
        where F: FnOnce() -> O, O: Into<Error>,
    {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().chain(f().into())),
        }
    }
}
