// src/models/statistics.rs

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::registration::{
    Course, Gender, Modality, PaymentStatus, Registration, ADULT_SHIRT_SIZES,
};

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ModalityStats {
    pub infantil: i64,
    pub adulto: i64,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct CourseStats {
    pub kids: i64,
    pub run_5k: i64,
    pub walk_3k: i64,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct PaymentStats {
    pub pending: i64,
    pub paid: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RaceStatistics {
    pub total_inscriptions: i64,
    pub male_count: i64,
    pub female_count: i64,
    pub inscriptions_today: i64,
    pub modality_stats: ModalityStats,
    pub course_stats: CourseStats,
    pub payment_stats: PaymentStats,
    /// Contagem por tamanho adulto (PP..XXG), sempre com todas as chaves.
    pub shirt_size_stats: BTreeMap<String, i64>,
    pub timestamp: DateTime<Utc>,
}

impl RaceStatistics {
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            total_inscriptions: 0,
            male_count: 0,
            female_count: 0,
            inscriptions_today: 0,
            modality_stats: ModalityStats::default(),
            course_stats: CourseStats::default(),
            payment_stats: PaymentStats::default(),
            shirt_size_stats: ADULT_SHIRT_SIZES.iter().map(|s| (s.to_string(), 0)).collect(),
            timestamp,
        }
    }

    /// Agrega em memória; o repositório Postgres faz o mesmo cálculo em SQL.
    pub fn from_registrations(registrations: &[Registration], today: NaiveDate, timestamp: DateTime<Utc>) -> Self {
        let mut stats = Self::empty(timestamp);

        for r in registrations {
            stats.total_inscriptions += 1;
            match r.gender {
                Gender::Male => stats.male_count += 1,
                Gender::Female => stats.female_count += 1,
            }
            if r.created_at.date_naive() == today {
                stats.inscriptions_today += 1;
            }
            match r.modality {
                Modality::Infantil => stats.modality_stats.infantil += 1,
                Modality::Adulto => stats.modality_stats.adulto += 1,
            }
            match r.course {
                Course::Kids => stats.course_stats.kids += 1,
                Course::Run5k => stats.course_stats.run_5k += 1,
                Course::Walk3k => stats.course_stats.walk_3k += 1,
            }
            match r.payment_status {
                PaymentStatus::Pending => stats.payment_stats.pending += 1,
                PaymentStatus::Paid => stats.payment_stats.paid += 1,
            }
            if r.modality == Modality::Adulto {
                if let Some(count) = stats.shirt_size_stats.get_mut(&r.shirt_size) {
                    *count += 1;
                }
            }
        }

        stats
    }
}
