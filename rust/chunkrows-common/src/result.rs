pub type Result<T> = std::result::Result<T, crate::error::Error>;

#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_arg(result, stringify!($name), stringify!($expr))?;
    }};
}

#[macro_export]
macro_rules! verify_data {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_data(result, stringify!($name), stringify!($expr))?;
    }};
}

#[inline]
pub fn verify_arg(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_arg(name, condition)
    }
}

#[inline]
pub fn verify_data(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        malformed(name, condition)
    }
}

#[cold]
pub fn invalid_arg(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::InvalidArgument {
        name: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}

#[cold]
pub fn malformed(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::Decode {
        message: format!("{name}: {condition}"),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;

    fn check_prefetch(prefetch_size: usize) -> super::Result<usize> {
        verify_arg!(prefetch_size, prefetch_size != 0);
        Ok(prefetch_size)
    }

    fn check_width(width: usize, expected: usize) -> super::Result<()> {
        verify_data!(width, width == expected);
        Ok(())
    }

    #[test]
    fn test_verify_arg() {
        assert_eq!(check_prefetch(7).unwrap(), 7);
        let err = check_prefetch(0).unwrap_err();
        match err.kind() {
            ErrorKind::InvalidArgument { name, message } => {
                assert_eq!(name, "prefetch_size");
                assert_eq!(message, "prefetch_size != 0");
            }
            other => panic!("unexpected error kind: {other:?}"),
        }
    }

    #[test]
    fn test_verify_data() {
        check_width(3, 3).unwrap();
        let err = check_width(2, 3).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Decode { .. }));
        assert_eq!(err.to_string(), "malformed row: width: width == expected");
    }
}
