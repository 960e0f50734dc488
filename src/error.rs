/// Turns a failed [`Result`] into a log line for callers that carry on without the value.
pub trait ResultOkLogExt<T, E> {
    /// Returns the success value, or logs the error at error level and returns `None`.
    fn ok_log(self) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::error!("{err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_log() {
        let ok: Result<u8, std::fmt::Error> = Ok(3);
        assert_eq!(ok.ok_log(), Some(3));
        let err: Result<u8, std::fmt::Error> = Err(std::fmt::Error);
        assert_eq!(err.ok_log(), None);
    }
}
