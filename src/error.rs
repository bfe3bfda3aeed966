/// Turns a `Result` into an `Option`, logging the error at `error` level.
pub trait ResultOkLogExt<T, E> {
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
    use std::io;

    use super::*;

    #[test]
    fn test_ok_log() {
        let ok: Result<u8, io::Error> = Ok(7);
        assert_eq!(ok.ok_log(), Some(7));

        let err: Result<u8, io::Error> = Err(io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(err.ok_log(), None);
    }
}
