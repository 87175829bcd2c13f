//! Integration tests for catalog listings, reviews and stock counters.

use std::sync::Arc;

use common::{ProductId, Role, UserId};
use doc_store::InMemoryDocumentStore;
use domain::{
    Actor, CatalogError, CatalogService, Category, DomainError, ErrorKind, Money, ProductDraft,
    ProductQuery, ProductUpdate, PRODUCTS_PER_PAGE,
};

fn service() -> CatalogService<InMemoryDocumentStore> {
    CatalogService::new(InMemoryDocumentStore::new())
}

fn vendor() -> Actor {
    Actor::new(UserId::new(), Role::Vendor, "Vendor")
}

fn draft(name: &str, units: i64, stock: u32, category: Category) -> ProductDraft {
    ProductDraft {
        name: name.into(),
        description: "A product".into(),
        price: Money::from_units(units),
        stock,
        category,
        images: vec![],
    }
}

mod stock {
    use super::*;

    #[tokio::test]
    async fn insufficient_stock_leaves_counter_untouched() {
        let catalog = service();
        let p1 = catalog
            .create_product(&vendor(), draft("Kettle", 10, 3, Category::Electronics))
            .await
            .unwrap()
            .id;

        let err = catalog.decrease_stock(p1, 5).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert!(matches!(
            err,
            DomainError::Catalog(CatalogError::InsufficientStock {
                requested: 5,
                available: 3,
                ..
            })
        ));
        assert_eq!(catalog.get_product(p1).await.unwrap().stock, 3);
    }

    #[tokio::test]
    async fn decrease_to_exactly_zero() {
        let catalog = service();
        let p = catalog
            .create_product(&vendor(), draft("Kettle", 10, 3, Category::Electronics))
            .await
            .unwrap()
            .id;

        assert_eq!(catalog.decrease_stock(p, 3).await.unwrap(), 0);
        assert_eq!(
            catalog.decrease_stock(p, 1).await.unwrap_err().kind(),
            ErrorKind::InsufficientStock
        );
        assert_eq!(catalog.restore_stock(p, 2).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn zero_quantity_and_unknown_product() {
        let catalog = service();
        let p = catalog
            .create_product(&vendor(), draft("Kettle", 10, 3, Category::Electronics))
            .await
            .unwrap()
            .id;

        assert_eq!(
            catalog.decrease_stock(p, 0).await.unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            catalog
                .decrease_stock(ProductId::new(), 1)
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_decrements_never_oversell() {
        let catalog = Arc::new(service());
        let p = catalog
            .create_product(&vendor(), draft("Console", 400, 10, Category::Electronics))
            .await
            .unwrap()
            .id;

        let handles: Vec<_> = (0..25)
            .map(|_| {
                let catalog = Arc::clone(&catalog);
                tokio::spawn(async move { catalog.decrease_stock(p, 1).await })
            })
            .collect();

        let mut applied = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => applied += 1,
                Err(e) => {
                    assert_eq!(e.kind(), ErrorKind::InsufficientStock);
                    rejected += 1;
                }
            }
        }

        assert_eq!(applied, 10);
        assert_eq!(rejected, 15);
        assert_eq!(catalog.get_product(p).await.unwrap().stock, 0);
    }
}

mod listings {
    use super::*;

    #[tokio::test]
    async fn customers_cannot_list_products() {
        let catalog = service();
        let customer = Actor::new(UserId::new(), Role::Customer, "C");
        let err = catalog
            .create_product(&customer, draft("Pen", 1, 1, Category::Books))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn only_owner_or_admin_may_edit() {
        let catalog = service();
        let owner = vendor();
        let p = catalog
            .create_product(&owner, draft("Pen", 1, 1, Category::Books))
            .await
            .unwrap()
            .id;

        let update = ProductUpdate {
            price: Some(Money::from_units(2)),
            ..Default::default()
        };
        let err = catalog
            .update_product(&vendor(), p, update.clone())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(
            catalog.delete_product(&vendor(), p).await.unwrap_err().kind(),
            ErrorKind::Authorization
        );

        let admin = Actor::new(UserId::new(), Role::Admin, "Root");
        let (updated, replaced) = catalog.update_product(&admin, p, update).await.unwrap();
        assert_eq!(updated.price, Money::from_units(2));
        assert!(replaced.is_empty());

        catalog.delete_product(&owner, p).await.unwrap();
        assert_eq!(
            catalog.get_product(p).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn search_filters_and_pages() {
        let catalog = service();
        let seller = vendor();
        for i in 0..15 {
            catalog
                .create_product(&seller, draft(&format!("Phone {i}"), 100 + i, 5, Category::Electronics))
                .await
                .unwrap();
        }
        catalog
            .create_product(&seller, draft("Rust in Action", 30, 5, Category::Books))
            .await
            .unwrap();

        let first = catalog
            .list_products(ProductQuery {
                keyword: Some("phone".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(first.products_count, 16);
        assert_eq!(first.filtered_products_count, 15);
        assert_eq!(first.products.len(), PRODUCTS_PER_PAGE);
        assert_eq!(first.res_per_page, 12);

        let second = catalog
            .list_products(ProductQuery {
                keyword: Some("phone".into()),
                page: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(second.products.len(), 3);

        let books = catalog
            .list_products(ProductQuery {
                category: Some(Category::Books),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(books.filtered_products_count, 1);

        let priced = catalog
            .list_products(ProductQuery {
                min_price: Some(Money::from_units(105)),
                max_price: Some(Money::from_units(108)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(priced.filtered_products_count, 4);

        assert_eq!(catalog.count_vendor_products(seller.id).await.unwrap(), 16);
        assert_eq!(catalog.vendor_products(seller.id).await.unwrap().len(), 16);
    }
}

mod reviews {
    use super::*;

    #[tokio::test]
    async fn reviewing_twice_replaces_the_first_review() {
        let catalog = service();
        let p = catalog
            .create_product(&vendor(), draft("Pen", 1, 1, Category::Books))
            .await
            .unwrap()
            .id;
        let reader = Actor::new(UserId::new(), Role::Customer, "Reader");
        let other = Actor::new(UserId::new(), Role::Customer, "Other");

        catalog.submit_review(&reader, p, 2, "meh".into()).await.unwrap();
        catalog.submit_review(&other, p, 5, "great".into()).await.unwrap();
        let product = catalog
            .submit_review(&reader, p, 4, "better now".into())
            .await
            .unwrap();

        assert_eq!(product.num_of_reviews, 2);
        assert!((product.ratings - 4.5).abs() < f64::EPSILON);
        let reviews = catalog.reviews(p).await.unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].comment, "better now");
        assert_eq!(reviews[0].name, "Reader");

        let err = catalog.submit_review(&reader, p, 6, "x".into()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
