use std::sync::Arc;

use crate::database::Database;

pub struct AppState {
    pub db: Arc<Database>,
    /// Orders shown per page of `GET /api/cinema/orders/`
    pub orders_page_size: u64,
}
