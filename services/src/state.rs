use crate::config::Config;

/// Shared handler state: the three storage backends.
///
/// `Config` travels separately as a request extension so extractors
/// like `RequireAuth` can read it without knowing the storage types.
#[derive(Clone)]
pub struct AppState<S, U, F> {
    pub sql_storage: S,
    pub user_storage: U,
    pub file_storage: F,
}

impl<S, U, F> AppState<S, U, F> {
    pub fn new(sql_storage: S, user_storage: U, file_storage: F) -> Self {
        Self {
            sql_storage,
            user_storage,
            file_storage,
        }
    }
}

/// Everything a presenter needs to turn rows into responses.
pub struct Ctx<'a, S, U, F> {
    pub state: &'a AppState<S, U, F>,
    pub config: &'a Config,
    /// Authenticated viewer, `None` for anonymous requests.
    pub viewer: Option<i64>,
}

impl<S, U, F> Clone for Ctx<'_, S, U, F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, U, F> Copy for Ctx<'_, S, U, F> {}
