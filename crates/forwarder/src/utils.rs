/// Returns early with `$error` unless `$predicate` holds.
///
/// ```ignore
/// ensure!(port != 0, ConfigError::InvalidPort { port: 0 });
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
