use crate::database::{ChangeFeed, DynStore, SubscriptionHandle, Table, TableMirror, put};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::utils::generate_id;
use std::sync::Arc;

/// Products and categories, read from mirrors kept fresh by the change feed.
#[derive(Clone)]
pub struct CatalogService {
    store: DynStore,
    products: Arc<TableMirror<Product>>,
    categories: Arc<TableMirror<Category>>,
}

impl CatalogService {
    pub fn new(store: DynStore) -> Self {
        Self {
            products: TableMirror::new(Table::Products, store.clone()),
            categories: TableMirror::new(Table::Categories, store.clone()),
            store,
        }
    }

    /// Subscribe both mirrors to `feed`.
    pub fn attach(&self, feed: &dyn ChangeFeed) -> Vec<SubscriptionHandle> {
        vec![self.products.attach(feed), self.categories.attach(feed)]
    }

    /// 重新加载两张表，失败只记录日志
    pub async fn reload(&self) {
        for result in [self.products.refresh().await, self.categories.refresh().await] {
            if let Err(e) = result {
                log::warn!("Catalog reload failed: {e}");
            }
        }
    }

    pub async fn list_products(&self, query: &ProductQuery) -> AppResult<Vec<Product>> {
        let mut products = self.products.snapshot().await?;
        if let Some(category_id) = query.category_id.as_deref().filter(|c| !c.is_empty()) {
            products.retain(|p| p.category_id == category_id);
        }
        if query.available_only.unwrap_or(false) {
            products.retain(|p| p.is_available);
        }
        Ok(products)
    }

    pub async fn get_product(&self, id: &str) -> AppResult<Product> {
        self.products
            .snapshot()
            .await?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Product {id} not found")))
    }

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.categories.snapshot().await
    }

    pub async fn upsert_product(&self, request: UpsertProductRequest) -> AppResult<Product> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AppError::ValidationError("Product name is required".to_string()));
        }
        if !request.price.is_finite() || request.price < 0.0 {
            return Err(AppError::ValidationError(
                "Price must be zero or more".to_string(),
            ));
        }

        let product = Product {
            id: request
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| generate_id("P")),
            name: name.to_string(),
            description: request.description,
            price: request.price,
            images: request.images,
            category_id: request.category_id,
            section_id: request.section_id,
            is_available: request.is_available,
            stock: request.stock.max(0),
            specifications: request.specifications,
        };
        put(self.store.as_ref(), Table::Products, &product, &product.id).await?;
        // 保证管理员立即看到自己的修改
        self.products.refresh().await?;
        log::info!("Product saved: {}", product.id);
        Ok(product)
    }

    pub async fn delete_product(&self, id: &str) -> AppResult<()> {
        self.store.delete(Table::Products, id).await?;
        self.products.refresh().await?;
        Ok(())
    }

    pub async fn upsert_category(&self, request: UpsertCategoryRequest) -> AppResult<Category> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AppError::ValidationError("Category name is required".to_string()));
        }
        let category = Category {
            id: request
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| generate_id("CAT")),
            name: name.to_string(),
            sections: request.sections,
        };
        put(self.store.as_ref(), Table::Categories, &category, &category.id).await?;
        self.categories.refresh().await?;
        Ok(category)
    }

    pub async fn delete_category(&self, id: &str) -> AppResult<()> {
        self.store.delete(Table::Categories, id).await?;
        self.categories.refresh().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    fn product_request(name: &str, price: f64, available: bool) -> UpsertProductRequest {
        UpsertProductRequest {
            id: None,
            name: name.into(),
            description: String::new(),
            price,
            images: vec![],
            category_id: "kosha".into(),
            section_id: String::new(),
            is_available: available,
            stock: 3,
            specifications: Specifications::default(),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_filter_products() {
        let svc = CatalogService::new(Arc::new(MemoryStore::new()));
        let kosha = svc
            .upsert_product(product_request("كوشة ملكية", 1500.0, true))
            .await
            .unwrap();
        svc.upsert_product(product_request("كوشة قديمة", 500.0, false))
            .await
            .unwrap();

        let all = svc.list_products(&ProductQuery::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let available = svc
            .list_products(&ProductQuery {
                category_id: Some("kosha".into()),
                available_only: Some(true),
            })
            .await
            .unwrap();
        assert_eq!(available, vec![kosha.clone()]);

        assert_eq!(svc.get_product(&kosha.id).await.unwrap().price, 1500.0);
    }

    #[tokio::test]
    async fn test_update_existing_product_keeps_id() {
        let svc = CatalogService::new(Arc::new(MemoryStore::new()));
        let created = svc
            .upsert_product(product_request("Chair", 20.0, true))
            .await
            .unwrap();

        let mut edit = product_request("Chair", 25.0, true);
        edit.id = Some(created.id.clone());
        svc.upsert_product(edit).await.unwrap();

        let products = svc.list_products(&ProductQuery::default()).await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].price, 25.0);
    }

    #[tokio::test]
    async fn test_invalid_product_rejected() {
        let svc = CatalogService::new(Arc::new(MemoryStore::new()));
        assert!(svc.upsert_product(product_request(" ", 1.0, true)).await.is_err());
        assert!(svc.upsert_product(product_request("x", -1.0, true)).await.is_err());
    }

    #[tokio::test]
    async fn test_category_crud() {
        let svc = CatalogService::new(Arc::new(MemoryStore::new()));
        let cat = svc
            .upsert_category(UpsertCategoryRequest {
                id: Some("lights".into()),
                name: "إضاءة".into(),
                sections: vec![],
            })
            .await
            .unwrap();
        assert_eq!(svc.list_categories().await.unwrap().len(), 1);

        svc.delete_category(&cat.id).await.unwrap();
        assert!(svc.list_categories().await.unwrap().is_empty());
        assert!(matches!(
            svc.get_product("nope").await,
            Err(AppError::NotFound(_))
        ));
    }
}
