//! Dashboard DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{DateRange, SupplierId, TechnicianId};
use domain_claims::{ClaimCriteria, FilterSet};
use domain_dashboard::{
    Assessment, BoardStatus, DashboardRequest, MetricBoard, MetricKind, MetricResult, MetricValue,
    Polarity,
};

use crate::error::ApiError;

/// Window used when the caller gives neither `start` nor `end`
pub const DEFAULT_RANGE_DAYS: u32 = 30;

/// Query string shared by every dashboard endpoint
#[derive(Debug, Default, Deserialize, Validate)]
pub struct DashboardQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub supplier_id: Option<Uuid>,
    pub technician_id: Option<Uuid>,
    #[validate(length(max = 100))]
    pub machine_model: Option<String>,
    #[validate(range(min = 1, max = 999999))]
    pub account_code: Option<i32>,
    /// Overrides the report clock; defaults to the time of the request
    pub as_of: Option<DateTime<Utc>>,
}

impl DashboardQuery {
    pub fn into_request(self, now: DateTime<Utc>) -> Result<DashboardRequest, ApiError> {
        self.validate()?;
        let as_of = self.as_of.unwrap_or(now);

        let range = match (self.start, self.end) {
            (Some(start), Some(end)) => DateRange::new(start, end)?,
            (None, None) => DateRange::trailing_days(as_of, DEFAULT_RANGE_DAYS)?,
            _ => {
                return Err(ApiError::BadRequest(
                    "start and end must be given together".to_string(),
                ))
            }
        };

        let mut criteria = ClaimCriteria::new();
        if let Some(id) = self.supplier_id {
            criteria = criteria.with_supplier(SupplierId::from_uuid(id));
        }
        if let Some(id) = self.technician_id {
            criteria = criteria.with_technician(TechnicianId::from_uuid(id));
        }
        if let Some(model) = self.machine_model {
            criteria = criteria.with_machine_model(model);
        }
        if let Some(code) = self.account_code {
            criteria = criteria.with_account_code(code);
        }

        Ok(DashboardRequest::new(
            FilterSet::new(range).with_criteria(criteria),
            as_of,
        ))
    }
}

/// One card as rendered by the client
#[derive(Debug, Serialize)]
pub struct CardResponse {
    pub metric: MetricKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polarity: Option<Polarity>,
    /// Direction of the trend read through the polarity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment: Option<Assessment>,
    #[serde(flatten)]
    pub result: MetricResult<MetricValue>,
}

impl CardResponse {
    pub fn new(metric: MetricKind, result: MetricResult<MetricValue>) -> Self {
        let polarity = metric.polarity();
        let assessment = match (&result, polarity) {
            (MetricResult::Ready(MetricValue::Kpi(card)), Some(polarity)) => {
                Some(polarity.assess(card.trend.direction))
            }
            _ => None,
        };
        Self {
            metric,
            polarity,
            assessment,
            result,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub status: BoardStatus,
    pub as_of: DateTime<Utc>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub cards: Vec<CardResponse>,
}

impl DashboardResponse {
    pub fn new(request: &DashboardRequest, board: MetricBoard) -> Self {
        Self {
            status: board.status(),
            as_of: request.as_of,
            start: request.filter.range.start(),
            end: request.filter.range.end(),
            cards: board
                .cards()
                .map(|(kind, result)| CardResponse::new(kind, result.clone()))
                .collect(),
        }
    }
}
