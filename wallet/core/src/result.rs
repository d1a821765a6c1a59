pub type Result<T, E = crate::error::Error> = std::result::Result<T, E>;
