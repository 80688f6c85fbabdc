//! Quote service
//!
//! Orchestrates the estimate flow consumed by the calculator and quote
//! screens: resolve the project type's base price, run the pricing engine,
//! and hand the engine's snapshot prices to the repository for atomic
//! persistence. The service never recomputes a stored price.

use serde::Deserialize;
use std::sync::Arc;

use crate::db::repositories::{
    CatalogError, CatalogRepository, QuoteRepository, QuoteRepositoryError,
};
use crate::models::{
    LeadStatus, NewQuote, Quote, QuoteContactUpdate, QuoteFeature, QuotePage, SelectedFeature,
    SelectedPage,
};
use crate::pricing::{self, PriceBreakdown, PricingError};

/// Error types for quote service operations
#[derive(Debug, thiserror::Error)]
pub enum QuoteServiceError {
    /// Estimate computation rejected the input
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// The requested project type does not exist in the catalog
    #[error("Project type not found: {0}")]
    UnknownProjectType(i64),

    /// Catalog read failure
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Quote persistence failure
    #[error(transparent)]
    Repository(#[from] QuoteRepositoryError),
}

/// Everything the quote-save screen submits
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteRequest {
    pub project_type_id: i64,
    pub client_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    /// Already filtered to the project type by the caller.
    pub selected_features: Vec<SelectedFeature>,
    pub selected_pages: Vec<SelectedPage>,
}

/// A quote header together with its line items
#[derive(Debug, Clone, serde::Serialize)]
pub struct QuoteDetail {
    pub quote: Quote,
    pub features: Vec<QuoteFeature>,
    pub pages: Vec<QuotePage>,
}

pub struct QuoteService {
    catalog: Arc<dyn CatalogRepository>,
    quotes: Arc<dyn QuoteRepository>,
}

impl QuoteService {
    pub fn new(catalog: Arc<dyn CatalogRepository>, quotes: Arc<dyn QuoteRepository>) -> Self {
        Self { catalog, quotes }
    }

    /// Compute an estimate without persisting anything.
    pub async fn estimate(
        &self,
        project_type_id: i64,
        selected_features: &[SelectedFeature],
        selected_pages: &[SelectedPage],
    ) -> Result<PriceBreakdown, QuoteServiceError> {
        let project_type = self
            .catalog
            .get_project_type(project_type_id)
            .await?
            .ok_or(QuoteServiceError::UnknownProjectType(project_type_id))?;
        Ok(pricing::calculate(
            project_type.base_price,
            selected_features,
            selected_pages,
        )?)
    }

    /// Price the request and persist it as an immutable quote.
    ///
    /// The engine's line amounts go to the repository as-is; if any insert
    /// fails the repository rolls the whole quote back.
    pub async fn create_quote(&self, request: QuoteRequest) -> Result<Quote, QuoteServiceError> {
        let project_type = self
            .catalog
            .get_project_type(request.project_type_id)
            .await?
            .ok_or(QuoteServiceError::UnknownProjectType(request.project_type_id))?;

        let breakdown = pricing::calculate(
            project_type.base_price,
            &request.selected_features,
            &request.selected_pages,
        )?;

        let header = NewQuote {
            project_type_id: request.project_type_id,
            client_name: request.client_name,
            email: request.email,
            phone: request.phone,
            company: request.company,
            notes: request.notes,
            created_by: request.created_by,
        };

        let quote = self
            .quotes
            .create(
                &header,
                breakdown.total_price,
                &breakdown.feature_lines,
                &breakdown.page_lines,
            )
            .await?;

        tracing::debug!(
            quote_id = quote.id,
            features = breakdown.feature_lines.len(),
            pages = breakdown.page_lines.len(),
            "Quote persisted"
        );
        Ok(quote)
    }

    /// A quote with its snapshot line items; `None` when the id is unknown.
    pub async fn get_quote_detail(
        &self,
        id: i64,
    ) -> Result<Option<QuoteDetail>, QuoteServiceError> {
        let Some(quote) = self.quotes.get_by_id(id).await? else {
            return Ok(None);
        };
        let features = self.quotes.get_features(id).await?;
        let pages = self.quotes.get_pages(id).await?;
        Ok(Some(QuoteDetail {
            quote,
            features,
            pages,
        }))
    }

    pub async fn list_quotes(&self) -> Result<Vec<Quote>, QuoteServiceError> {
        Ok(self.quotes.list().await?)
    }

    pub async fn update_status(
        &self,
        id: i64,
        status: LeadStatus,
    ) -> Result<(), QuoteServiceError> {
        Ok(self.quotes.update_status(id, status).await?)
    }

    pub async fn update_contact(
        &self,
        id: i64,
        update: &QuoteContactUpdate,
    ) -> Result<(), QuoteServiceError> {
        Ok(self.quotes.update_contact(id, update).await?)
    }

    pub async fn delete_quote(&self, id: i64) -> Result<(), QuoteServiceError> {
        Ok(self.quotes.delete(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Feature, FeaturePricing, Page, ProjectType};
    use crate::pricing::{FeatureLine, PageLine};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    /// In-memory catalog with one project type.
    struct FakeCatalog {
        project_type: ProjectType,
    }

    #[async_trait]
    impl CatalogRepository for FakeCatalog {
        async fn list_project_types(&self) -> Result<Vec<ProjectType>, CatalogError> {
            Ok(vec![self.project_type.clone()])
        }

        async fn get_project_type(&self, id: i64) -> Result<Option<ProjectType>, CatalogError> {
            Ok((id == self.project_type.id).then(|| self.project_type.clone()))
        }

        async fn features_for_project_type(
            &self,
            _project_type_id: i64,
        ) -> Result<Vec<Feature>, CatalogError> {
            Ok(vec![])
        }

        async fn pages_for_project_type(
            &self,
            _project_type_id: i64,
        ) -> Result<Vec<Page>, CatalogError> {
            Ok(vec![])
        }
    }

    /// Records what the service hands to the persistence layer.
    #[derive(Default)]
    struct RecordingQuoteRepo {
        created: Mutex<Vec<(NewQuote, f64, Vec<FeatureLine>, Vec<PageLine>)>>,
    }

    #[async_trait]
    impl QuoteRepository for RecordingQuoteRepo {
        async fn create(
            &self,
            quote: &NewQuote,
            total_price: f64,
            feature_lines: &[FeatureLine],
            page_lines: &[PageLine],
        ) -> Result<Quote, QuoteRepositoryError> {
            self.created.lock().unwrap().push((
                quote.clone(),
                total_price,
                feature_lines.to_vec(),
                page_lines.to_vec(),
            ));
            let now = Utc::now();
            Ok(Quote {
                id: 1,
                project_type_id: quote.project_type_id,
                client_name: quote.client_name.clone(),
                email: quote.email.clone(),
                phone: quote.phone.clone(),
                company: quote.company.clone(),
                notes: quote.notes.clone(),
                total_price,
                lead_status: LeadStatus::InProgress,
                created_by: quote.created_by.clone(),
                created_at: now,
                updated_at: now,
            })
        }

        async fn get_by_id(&self, _id: i64) -> Result<Option<Quote>, QuoteRepositoryError> {
            Ok(None)
        }

        async fn list(&self) -> Result<Vec<Quote>, QuoteRepositoryError> {
            Ok(vec![])
        }

        async fn get_features(
            &self,
            _quote_id: i64,
        ) -> Result<Vec<QuoteFeature>, QuoteRepositoryError> {
            Ok(vec![])
        }

        async fn get_pages(&self, _quote_id: i64) -> Result<Vec<QuotePage>, QuoteRepositoryError> {
            Ok(vec![])
        }

        async fn update_status(
            &self,
            _id: i64,
            _status: LeadStatus,
        ) -> Result<(), QuoteRepositoryError> {
            Ok(())
        }

        async fn update_contact(
            &self,
            _id: i64,
            _update: &QuoteContactUpdate,
        ) -> Result<(), QuoteRepositoryError> {
            Ok(())
        }

        async fn delete(&self, _id: i64) -> Result<(), QuoteRepositoryError> {
            Ok(())
        }
    }

    fn project_type(id: i64, base_price: f64) -> ProjectType {
        let now = Utc::now();
        ProjectType {
            id,
            name: "Business Website".to_string(),
            description: None,
            base_price,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn fixed_selection(id: i64, flat_price: f64, quantity: i64) -> SelectedFeature {
        let now = Utc::now();
        SelectedFeature {
            feature: Feature {
                id,
                name: format!("feature-{}", id),
                category: None,
                pricing: FeaturePricing::Fixed { flat_price },
                supports_quantity: true,
                for_all_project_types: true,
                project_type_ids: vec![],
                is_active: true,
                created_at: now,
                updated_at: now,
            },
            quantity,
        }
    }

    fn hourly_selection(id: i64, rate: f64, hours: f64, quantity: i64) -> SelectedFeature {
        let mut selection = fixed_selection(id, 0.0, quantity);
        selection.feature.pricing = FeaturePricing::Hourly {
            hourly_rate: rate,
            estimated_hours: hours,
        };
        selection
    }

    fn page_selection(id: i64, price_per_page: f64, quantity: i64) -> SelectedPage {
        let now = Utc::now();
        SelectedPage {
            page: Page {
                id,
                name: format!("page-{}", id),
                price_per_page,
                project_type_id: None,
                default_quantity: 1,
                is_active: true,
                supports_quantity: true,
                created_at: now,
                updated_at: now,
            },
            quantity,
        }
    }

    fn service_with(repo: Arc<RecordingQuoteRepo>, base_price: f64) -> QuoteService {
        QuoteService::new(
            Arc::new(FakeCatalog {
                project_type: project_type(10, base_price),
            }),
            repo,
        )
    }

    fn request(features: Vec<SelectedFeature>, pages: Vec<SelectedPage>) -> QuoteRequest {
        QuoteRequest {
            project_type_id: 10,
            client_name: "Acme".to_string(),
            email: Some("buyer@acme.test".to_string()),
            phone: None,
            company: None,
            notes: None,
            created_by: Some("sales@ours.test".to_string()),
            selected_features: features,
            selected_pages: pages,
        }
    }

    #[tokio::test]
    async fn test_create_quote_persists_engine_snapshot() {
        let repo = Arc::new(RecordingQuoteRepo::default());
        let service = service_with(repo.clone(), 2000.0);

        let quote = service
            .create_quote(request(
                vec![
                    fixed_selection(1, 500.0, 1),
                    hourly_selection(2, 100.0, 5.0, 2),
                ],
                vec![page_selection(3, 50.0, 4)],
            ))
            .await
            .unwrap();

        assert_eq!(quote.total_price, 3700.0);

        let created = repo.created.lock().unwrap();
        let (_, total, feature_lines, page_lines) = &created[0];
        assert_eq!(*total, 3700.0);
        assert_eq!(feature_lines[0].price, 500.0);
        assert_eq!(feature_lines[1].price, 1000.0);
        assert_eq!(page_lines[0].price, 200.0);
    }

    #[tokio::test]
    async fn test_create_quote_unknown_project_type() {
        let repo = Arc::new(RecordingQuoteRepo::default());
        let service = service_with(repo.clone(), 2000.0);

        let mut req = request(vec![], vec![]);
        req.project_type_id = 99;
        let err = service.create_quote(req).await.unwrap_err();
        assert!(matches!(err, QuoteServiceError::UnknownProjectType(99)));
        assert!(repo.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_quote_invalid_quantity_never_reaches_repository() {
        let repo = Arc::new(RecordingQuoteRepo::default());
        let service = service_with(repo.clone(), 2000.0);

        let err = service
            .create_quote(request(vec![fixed_selection(1, 500.0, 0)], vec![]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QuoteServiceError::Pricing(PricingError::InvalidQuantity { .. })
        ));
        assert!(repo.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_estimate_does_not_persist() {
        let repo = Arc::new(RecordingQuoteRepo::default());
        let service = service_with(repo.clone(), 1500.0);

        let breakdown = service
            .estimate(10, &[fixed_selection(1, 250.0, 2)], &[])
            .await
            .unwrap();
        assert_eq!(breakdown.total_price, 2000.0);
        assert!(repo.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_quote_detail_is_none() {
        let repo = Arc::new(RecordingQuoteRepo::default());
        let service = service_with(repo, 1500.0);
        assert!(service.get_quote_detail(42).await.unwrap().is_none());
    }
}
