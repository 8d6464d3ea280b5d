//! Shared application state.

use harvest_db::Database;

/// State handed to every handler.
///
/// `Database` is a cheap handle over the pool, so the state clones freely.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        AppState { db }
    }
}

/// Test fixtures: an in-memory database with a small catalog.
#[cfg(test)]
pub(crate) mod testing {
    use super::AppState;
    use harvest_core::{Customer, Product};
    use harvest_db::repository::product::NewProduct;
    use harvest_db::{Database, DbConfig};

    pub const ACCOUNT: &str = "farm-1";

    pub struct Fixture {
        pub state: AppState,
        pub customer: Customer,
        pub corn: Product,
        pub honey: Product,
    }

    /// Sweet Corn @ 10.00 (stock 20), Wildflower Honey @ 5.00 (stock 12).
    pub async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let corn = db
            .products()
            .create(
                ACCOUNT,
                &NewProduct {
                    sku: "CORN-01".into(),
                    name: "Sweet Corn".into(),
                    cost_price_cents: 600,
                    selling_price_cents: 1000,
                    stock: 20,
                },
            )
            .await
            .unwrap();
        let honey = db
            .products()
            .create(
                ACCOUNT,
                &NewProduct {
                    sku: "HONEY-500".into(),
                    name: "Wildflower Honey".into(),
                    cost_price_cents: 200,
                    selling_price_cents: 500,
                    stock: 12,
                },
            )
            .await
            .unwrap();
        let customer = db
            .customers()
            .create(ACCOUNT, "Greenway Grocers", None, None)
            .await
            .unwrap();

        Fixture {
            state: AppState::new(db),
            customer,
            corn,
            honey,
        }
    }
}
