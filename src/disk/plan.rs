//! Partition geometry for the single-disk layout:
//! primary #1 for the system, extended #2 holding logical #5 for swap.

use serde::Serialize;

use crate::error::PrepareError;

use super::catalog::Drive;

/// DOS partition type code for Linux swap.
pub const SWAP_TYPE_CODE: &str = "82";

/// Partitions whose creation consumes alignment slack: primary and extended.
const ALIGNED_PARTITIONS: u64 = 2;

/// Smallest primary partition the planner leaves, one MiB.
pub const MIN_PRIMARY_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub sector_size: u64,
    pub first_sector: u64,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            sector_size: 512,
            first_sector: 2048,
        }
    }
}

impl Geometry {
    /// `None` when the configured geometry does not fit in 64 bits.
    pub fn reserved_offset_bytes(&self) -> Option<u64> {
        self.first_sector
            .checked_mul(self.sector_size)?
            .checked_mul(ALIGNED_PARTITIONS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizedPartition {
    pub number: u32,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapPartition {
    pub number: u32,
    pub type_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionPlan {
    pub drive_name: String,
    pub primary: SizedPartition,
    pub extended: SizedPartition,
    pub swap: SwapPartition,
    pub reserved_offset_bytes: u64,
}

impl PartitionPlan {
    /// The logical swap partition fills its extended container.
    pub fn swap_size_bytes(&self) -> u64 {
        self.extended.size_bytes
    }

    pub fn total_bytes(&self) -> u64 {
        self.primary.size_bytes + self.swap_size_bytes() + self.reserved_offset_bytes
    }
}

/// Rejects drives below the installation minimum.
pub fn validate_drive(drive: &Drive, min_bytes: u64) -> Result<(), PrepareError> {
    if drive.size_bytes < min_bytes {
        return Err(PrepareError::DriveTooSmall {
            drive: drive.name.clone(),
            size_bytes: drive.size_bytes,
            min_bytes,
        });
    }
    Ok(())
}

/// Largest swap size that still leaves [`MIN_PRIMARY_BYTES`] for the primary.
/// Zero when nothing fits.
pub fn max_swap_bytes(drive: &Drive, geometry: &Geometry) -> u64 {
    match geometry.reserved_offset_bytes() {
        Some(reserved) => drive
            .size_bytes
            .saturating_sub(reserved)
            .saturating_sub(MIN_PRIMARY_BYTES),
        None => 0,
    }
}

pub fn compute_plan(
    drive: &Drive,
    swap_bytes: u64,
    geometry: &Geometry,
) -> Result<PartitionPlan, PrepareError> {
    let Some(reserved) = geometry.reserved_offset_bytes() else {
        return Err(PrepareError::PlanInfeasible {
            drive: drive.name.clone(),
            swap_bytes,
            available_bytes: 0,
        });
    };
    let available = drive.size_bytes.saturating_sub(reserved);

    let infeasible = || PrepareError::PlanInfeasible {
        drive: drive.name.clone(),
        swap_bytes,
        available_bytes: available,
    };

    if swap_bytes == 0 || swap_bytes > available.saturating_sub(MIN_PRIMARY_BYTES) {
        return Err(infeasible());
    }

    let primary_bytes = available - swap_bytes;

    Ok(PartitionPlan {
        drive_name: drive.name.clone(),
        primary: SizedPartition {
            number: 1,
            size_bytes: primary_bytes,
        },
        extended: SizedPartition {
            number: 2,
            size_bytes: swap_bytes,
        },
        swap: SwapPartition {
            number: 5,
            type_code: SWAP_TYPE_CODE.to_string(),
        },
        reserved_offset_bytes: reserved,
    })
}
