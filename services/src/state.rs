/// Shared handles every route needs.
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
