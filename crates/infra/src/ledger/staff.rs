use tracing::info;

use stockhouse_auth::{Action, Actor, authorize};
use stockhouse_core::DomainError;
use stockhouse_staff::{OvertimeSummary, OvertimeTally, Period, SalesSummary, SalesTally};

use crate::store::LedgerTx;

use super::{LedgerResult, LedgerService};

/// Who and when a tally increment is for. `None` means the actor and the
/// current month.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TallyTarget {
    pub username: Option<String>,
    pub month: Option<u32>,
}

impl LedgerService {
    pub async fn record_sales(
        &self,
        actor: &Actor,
        target: TallyTarget,
        tries: i64,
        sales: i64,
    ) -> LedgerResult<SalesTally> {
        let (username, period) = self.tally_target(actor, target)?;

        let mut tx = self.begin().await?;
        ensure_employee(tx.as_mut(), actor, &username).await?;
        let mut tally = tx
            .sales_tally(&username, period)
            .await?
            .unwrap_or_else(|| SalesTally::new(username.clone(), period));
        tally.record(tries, sales)?;
        tx.save_sales_tally(&tally).await?;
        tx.commit().await?;

        info!(user = %username, %period, tries, sales, "sales tally recorded");
        Ok(tally)
    }

    pub async fn record_overtime(
        &self,
        actor: &Actor,
        target: TallyTarget,
        classic: i64,
        deluxe: i64,
    ) -> LedgerResult<OvertimeTally> {
        let (username, period) = self.tally_target(actor, target)?;

        let mut tx = self.begin().await?;
        ensure_employee(tx.as_mut(), actor, &username).await?;
        let mut tally = tx
            .overtime_tally(&username, period)
            .await?
            .unwrap_or_else(|| OvertimeTally::new(username.clone(), period));
        tally.record(classic, deluxe)?;
        tx.save_overtime_tally(&tally).await?;
        tx.commit().await?;

        info!(user = %username, %period, classic, deluxe, "overtime tally recorded");
        Ok(tally)
    }

    /// Sales per non-admin employee for a month, or the whole year when
    /// `month` is `None`.
    pub async fn sales_summary(&self, year: i32, month: Option<u32>) -> LedgerResult<SalesSummary> {
        if let Some(m) = month {
            Period::new(year, m)?;
        }
        let mut tx = self.begin().await?;
        let employees = employees(tx.as_mut()).await?;
        let tallies = tx.sales_tallies(year, month).await?;
        Ok(SalesSummary::build(year, month, &employees, &tallies))
    }

    pub async fn overtime_summary(
        &self,
        year: i32,
        month: Option<u32>,
    ) -> LedgerResult<OvertimeSummary> {
        if let Some(m) = month {
            Period::new(year, m)?;
        }
        let mut tx = self.begin().await?;
        let employees = employees(tx.as_mut()).await?;
        let tallies = tx.overtime_tallies(year, month).await?;
        Ok(OvertimeSummary::build(year, month, &employees, &tallies))
    }

    /// Resolve the tally owner and period (always within the current year).
    fn tally_target(&self, actor: &Actor, target: TallyTarget) -> LedgerResult<(String, Period)> {
        let current = Period::containing(self.clock.now());
        let period = match target.month {
            Some(m) => Period::new(current.year(), m)?,
            None => current,
        };
        let username = target
            .username
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| actor.username.clone());

        authorize(
            actor,
            Action::RecordStaffTally {
                for_user: &username,
                current_month: period == current,
            },
        )?;
        Ok((username, period))
    }
}

/// Tallies for someone else must name a directory user.
async fn ensure_employee(tx: &mut dyn LedgerTx, actor: &Actor, username: &str) -> LedgerResult<()> {
    if username == actor.username {
        return Ok(());
    }
    match tx.user_by_username(username).await? {
        Some(_) => Ok(()),
        None => Err(DomainError::not_found(format!("user {username}")).into()),
    }
}

async fn employees(tx: &mut dyn LedgerTx) -> LedgerResult<Vec<String>> {
    Ok(tx
        .users()
        .await?
        .into_iter()
        .filter(|u| !u.is_admin())
        .map(|u| u.username().to_string())
        .collect())
}
