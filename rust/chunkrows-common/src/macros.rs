/// Unwraps a `Result<T, E>` inside a function returning `Option<Result<T, E>>`.
///
/// - `Ok(t)` yields `t`.
/// - `Err(e)` returns `Some(Err(e))` from the enclosing function.
///
/// Intended for `Iterator::next()` implementations with
/// `Item = Result<T, E>` that drive fallible helpers, e.g. the owned-row
/// iterator over a row cursor.
#[macro_export]
macro_rules! try_or_ret_some_err {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(err) => {
                return Some(Err(err));
            }
        }
    };
}

#[cfg(test)]
mod tests {
    struct Countdown {
        remaining: i32,
    }

    fn step(remaining: i32) -> Result<i32, String> {
        if remaining < 0 {
            Err(format!("negative: {remaining}"))
        } else {
            Ok(remaining)
        }
    }

    impl Iterator for Countdown {
        type Item = Result<i32, String>;

        fn next(&mut self) -> Option<Self::Item> {
            if self.remaining == 0 {
                return None;
            }
            let value = try_or_ret_some_err!(step(self.remaining));
            self.remaining -= 1;
            Some(Ok(value))
        }
    }

    #[test]
    fn test_try_or_ret_some_err() {
        let values = Countdown { remaining: 3 }
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(values, vec![3, 2, 1]);

        let mut failing = Countdown { remaining: -1 };
        assert_eq!(failing.next(), Some(Err("negative: -1".to_string())));
    }
}
