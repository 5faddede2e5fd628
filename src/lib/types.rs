pub type ResultAnyError<T> = Result<T, anyhow::Error>;
