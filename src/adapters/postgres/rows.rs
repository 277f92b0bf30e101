//! Row structs and column parsing shared by the Postgres adapters.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::billing::{
    Payment, PaymentMetadata, PaymentStatus, PaymentType, Subscription, SubscriptionStatus,
};
use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentId, SubscriptionId, TenantId, Timestamp, UserId,
};
use crate::domain::tenancy::Tenant;

#[derive(Debug, sqlx::FromRow)]
pub(super) struct TenantRow {
    pub id: Uuid,
    pub name: String,
    pub subdomain: String,
    pub custom_domain: Option<String>,
    pub owner_id: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TenantRow> for Tenant {
    type Error = DomainError;

    fn try_from(row: TenantRow) -> Result<Self, Self::Error> {
        Ok(Tenant {
            id: TenantId::from_uuid(row.id),
            name: row.name,
            subdomain: row.subdomain,
            custom_domain: row.custom_domain,
            owner_id: UserId::new(row.owner_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid owner_id: {}", e))
            })?,
            is_active: row.is_active,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct SubscriptionRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub status: String,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub next_billing_date: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            status: parse_subscription_status(&row.status)?,
            current_period_start: Timestamp::from_datetime(row.current_period_start),
            current_period_end: Timestamp::from_datetime(row.current_period_end),
            next_billing_date: Timestamp::from_datetime(row.next_billing_date),
            cancelled_at: row.cancelled_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct PaymentRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: String,
    pub payment_type: String,
    pub amount: i64,
    pub status: String,
    pub transaction_id: String,
    pub metadata: Json<PaymentMetadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            payment_type: parse_payment_type(&row.payment_type)?,
            amount: row.amount,
            status: parse_payment_status(&row.status)?,
            transaction_id: row.transaction_id,
            metadata: row.metadata.0,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

pub(super) fn parse_subscription_status(s: &str) -> Result<SubscriptionStatus, DomainError> {
    match s {
        "TRIAL" => Ok(SubscriptionStatus::Trial),
        "ACTIVE" => Ok(SubscriptionStatus::Active),
        "CANCELLED" => Ok(SubscriptionStatus::Cancelled),
        "EXPIRED" => Ok(SubscriptionStatus::Expired),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid subscription status: {}", s),
        )),
    }
}

pub(super) fn parse_payment_type(s: &str) -> Result<PaymentType, DomainError> {
    match s {
        "SETUP_FEE" => Ok(PaymentType::SetupFee),
        "MONTHLY_SUBSCRIPTION" => Ok(PaymentType::MonthlySubscription),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid payment type: {}", s),
        )),
    }
}

pub(super) fn parse_payment_status(s: &str) -> Result<PaymentStatus, DomainError> {
    match s {
        "PENDING" => Ok(PaymentStatus::Pending),
        "SUCCEEDED" => Ok(PaymentStatus::Succeeded),
        "FAILED" => Ok(PaymentStatus::Failed),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid payment status: {}", s),
        )),
    }
}
