// src/db/registration_repo.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Acquire, PgPool, Postgres, Transaction};

use crate::{
    common::error::AppError,
    db::registration_store::{RegistrationStore, SettleOutcome, SettlementInput},
    models::{
        registration::{NewRegistration, PaymentStatus, Registration, ADULT_SHIRT_SIZES},
        statistics::{CourseStats, ModalityStats, PaymentStats, RaceStatistics},
    },
    services::registration_number::RegistrationNumberGenerator,
};

const COLUMNS: &str = r#"
    id, full_name, cpf, email, phone, birth_date, gender, modality, course, shirt_size,
    responsible_full_name, responsible_cpf, responsible_email, responsible_phone,
    athlete_declaration, payment_status, checkout_session_id, payment_intent_id, pix_id,
    payment_amount, payment_date, registration_number, payment_email_sent,
    coupon_code, coupon_discount, created_at, updated_at
"#;

#[derive(Clone)]
pub struct RegistrationRepository {
    pool: PgPool,
}

impl RegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_many(&self, filter: &str) -> Result<Vec<Registration>, AppError> {
        let sql = format!("SELECT {COLUMNS} FROM race_registrations {filter} ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query_as::<_, Registration>(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn number_taken(tx: &mut Transaction<'_, Postgres>, number: &str) -> Result<bool, AppError> {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM race_registrations WHERE registration_number = $1)")
                .bind(number)
                .fetch_one(&mut **tx)
                .await?;
        Ok(taken)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[derive(sqlx::FromRow)]
struct StatisticsRow {
    total: i64,
    male: i64,
    female: i64,
    today: i64,
    infantil: i64,
    adulto: i64,
    kids: i64,
    run_5k: i64,
    walk_3k: i64,
    pending: i64,
    paid: i64,
}

#[async_trait]
impl RegistrationStore for RegistrationRepository {
    async fn insert(&self, new: &NewRegistration) -> Result<Registration, AppError> {
        let sql = format!(
            r#"
            INSERT INTO race_registrations (
                full_name, cpf, email, phone, birth_date, gender, modality, course, shirt_size,
                responsible_full_name, responsible_cpf, responsible_email, responsible_phone,
                athlete_declaration
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {COLUMNS}
            "#
        );

        let registration = sqlx::query_as::<_, Registration>(&sql)
            .bind(&new.full_name)
            .bind(&new.cpf)
            .bind(&new.email)
            .bind(&new.phone)
            .bind(new.birth_date)
            .bind(new.gender)
            .bind(new.modality)
            .bind(new.course)
            .bind(&new.shirt_size)
            .bind(&new.responsible_full_name)
            .bind(&new.responsible_cpf)
            .bind(&new.responsible_email)
            .bind(&new.responsible_phone)
            .bind(new.athlete_declaration)
            .fetch_one(&self.pool)
            .await?;

        Ok(registration)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Registration>, AppError> {
        let sql = format!("SELECT {COLUMNS} FROM race_registrations WHERE id = $1");
        let registration = sqlx::query_as::<_, Registration>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(registration)
    }

    async fn find_by_pix_id(&self, pix_id: &str) -> Result<Option<Registration>, AppError> {
        let sql = format!("SELECT {COLUMNS} FROM race_registrations WHERE pix_id = $1 ORDER BY id DESC LIMIT 1");
        let registration = sqlx::query_as::<_, Registration>(&sql)
            .bind(pix_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(registration)
    }

    async fn list(&self) -> Result<Vec<Registration>, AppError> {
        self.fetch_many("").await
    }

    async fn list_paid(&self) -> Result<Vec<Registration>, AppError> {
        self.fetch_many("WHERE payment_status = 'PAID'").await
    }

    async fn list_pending_pix(&self) -> Result<Vec<Registration>, AppError> {
        self.fetch_many("WHERE payment_status = 'PENDING' AND pix_id IS NOT NULL AND pix_id <> ''")
            .await
    }

    async fn cpf_has_paid_registration(&self, cpf: &str) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM race_registrations WHERE cpf = $1 AND payment_status = 'PAID')",
        )
        .bind(cpf)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn record_coupon(&self, id: i64, code: &str, discount: Decimal) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE race_registrations
            SET coupon_code = $2, coupon_discount = $3, updated_at = NOW()
            WHERE id = $1 AND coupon_code IS NULL
            "#,
        )
        .bind(id)
        .bind(code)
        .bind(discount)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn record_checkout_session(&self, id: i64, session_id: &str, amount: Decimal) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE race_registrations
            SET checkout_session_id = $2, payment_amount = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(session_id)
        .bind(amount)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_pix_charge(&self, id: i64, pix_id: &str, amount: Decimal) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE race_registrations
            SET pix_id = $2, payment_amount = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(pix_id)
        .bind(amount)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_email_sent(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("UPDATE race_registrations SET payment_email_sent = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn settle(
        &self,
        id: i64,
        input: SettlementInput,
        numbers: &RegistrationNumberGenerator,
    ) -> Result<SettleOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        // Trava a linha: chamadas concorrentes para o mesmo id esperam aqui.
        let sql = format!("SELECT {COLUMNS} FROM race_registrations WHERE id = $1 FOR UPDATE");
        let current = sqlx::query_as::<_, Registration>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::RegistrationNotFound(id))?;

        if current.payment_status == PaymentStatus::Paid {
            tx.commit().await?;
            return Ok(SettleOutcome::AlreadyPaid(current));
        }

        let attempts: Vec<String> = match current.registration_number.clone() {
            Some(existing) => vec![existing],
            None => numbers.attempts().collect(),
        };

        let sql = format!(
            r#"
            UPDATE race_registrations
            SET payment_status = 'PAID',
                payment_date = $2,
                payment_amount = COALESCE($3, payment_amount),
                payment_intent_id = COALESCE($4, payment_intent_id),
                registration_number = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        );

        for number in attempts {
            if current.registration_number.is_none() && Self::number_taken(&mut tx, &number).await? {
                continue;
            }

            // Savepoint: uma colisão no índice único não aborta a transação externa.
            let mut savepoint = (&mut tx).begin().await?;
            let result = sqlx::query_as::<_, Registration>(&sql)
                .bind(id)
                .bind(input.paid_at)
                .bind(input.amount)
                .bind(&input.payment_intent_id)
                .bind(&number)
                .fetch_one(&mut *savepoint)
                .await;

            match result {
                Ok(updated) => {
                    savepoint.commit().await?;
                    tx.commit().await?;
                    return Ok(SettleOutcome::Settled(updated));
                }
                Err(e) if is_unique_violation(&e) => {
                    savepoint.rollback().await?;
                    tracing::warn!(registration_id = id, number = %number, "Número de inscrição colidiu; tentando outro");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tx.rollback().await?;
        Err(AppError::InternalServerError(anyhow::anyhow!(
            "nenhum número de inscrição livre para a inscrição {id}"
        )))
    }

    async fn statistics(&self, today: NaiveDate) -> Result<RaceStatistics, AppError> {
        let row = sqlx::query_as::<_, StatisticsRow>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE gender = 'M') AS male,
                COUNT(*) FILTER (WHERE gender = 'F') AS female,
                COUNT(*) FILTER (WHERE (created_at AT TIME ZONE 'UTC')::date = $1) AS today,
                COUNT(*) FILTER (WHERE modality = 'INFANTIL') AS infantil,
                COUNT(*) FILTER (WHERE modality = 'ADULTO') AS adulto,
                COUNT(*) FILTER (WHERE course = 'KIDS') AS kids,
                COUNT(*) FILTER (WHERE course = 'RUN_5K') AS run_5k,
                COUNT(*) FILTER (WHERE course = 'WALK_3K') AS walk_3k,
                COUNT(*) FILTER (WHERE payment_status = 'PENDING') AS pending,
                COUNT(*) FILTER (WHERE payment_status = 'PAID') AS paid
            FROM race_registrations
            "#,
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await?;

        let sizes: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT shirt_size, COUNT(*)
            FROM race_registrations
            WHERE modality = 'ADULTO'
            GROUP BY shirt_size
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut stats = RaceStatistics::empty(chrono::Utc::now());
        stats.total_inscriptions = row.total;
        stats.male_count = row.male;
        stats.female_count = row.female;
        stats.inscriptions_today = row.today;
        stats.modality_stats = ModalityStats { infantil: row.infantil, adulto: row.adulto };
        stats.course_stats = CourseStats { kids: row.kids, run_5k: row.run_5k, walk_3k: row.walk_3k };
        stats.payment_stats = PaymentStats { pending: row.pending, paid: row.paid };
        for (size, count) in sizes {
            if ADULT_SHIRT_SIZES.contains(&size.as_str()) {
                stats.shirt_size_stats.insert(size, count);
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_database_errors_count_as_number_collisions() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(!is_unique_violation(&sqlx::Error::PoolTimedOut));
    }
}
