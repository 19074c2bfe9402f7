use eyre::{bail, ensure, Result, WrapErr};
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Decode the block of a run-length offset array
///
/// `lengths` holds prefix-sum offsets into a companion sequence, so category `i` occupies
/// `[lengths[i], lengths[i + 1])`. Nothing is checked here; see [checked_block_range].
#[inline(always)]
pub fn block_range(lengths: &[usize], i: usize) -> Range<usize> {
    lengths[i]..lengths[i + 1]
}

/// Same as [block_range], but verifies that the block exists, is non-decreasing and fits
/// inside a companion sequence of length `companion_len`
pub fn checked_block_range(
    lengths: &[usize],
    i: usize,
    companion_len: usize,
) -> Result<Range<usize>> {
    ensure!(
        i + 1 < lengths.len(),
        "Block {} requested, but the offset array only describes {} blocks",
        i,
        lengths.len().saturating_sub(1)
    );
    let range = block_range(lengths, i);
    ensure!(
        range.start <= range.end,
        "Offsets are decreasing at block {} ({} > {})",
        i,
        range.start,
        range.end
    );
    ensure!(
        range.end <= companion_len,
        "Block {} ends at {}, past the end of its companion array (length {})",
        i,
        range.end,
        companion_len
    );
    Ok(range)
}

/// A strain, identified by its 1-based id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StrainId(usize);

impl StrainId {
    pub fn from_id(id: usize) -> Result<Self> {
        ensure!(id >= 1, "Strain ids start at 1, found {}", id);
        Ok(Self(id))
    }
    pub fn id(&self) -> usize {
        self.0
    }
    pub fn index(&self) -> usize {
        self.0 - 1
    }
}

impl fmt::Display for StrainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of an exposure within an exposure history (1st, 2nd, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExposureOrder(usize);

impl ExposureOrder {
    pub fn from_id(id: usize) -> Result<Self> {
        ensure!(id >= 1, "Exposure orders start at 1, found {}", id);
        Ok(Self(id))
    }
    pub fn id(&self) -> usize {
        self.0
    }
    pub fn index(&self) -> usize {
        self.0 - 1
    }
}

/// Category of an exposure, selecting which kinetics parameter block applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExposureType {
    Infection,
    Vaccination,
    Adjuvant,
    Modifier,
    /// Any further, model-specific category
    Other(usize),
}

impl ExposureType {
    pub fn from_id(id: usize) -> Result<Self> {
        let kind = match id {
            0 => bail!("Exposure type ids start at 1, found 0"),
            1 => ExposureType::Infection,
            2 => ExposureType::Vaccination,
            3 => ExposureType::Adjuvant,
            4 => ExposureType::Modifier,
            other => ExposureType::Other(other),
        };
        Ok(kind)
    }

    pub fn id(&self) -> usize {
        match self {
            ExposureType::Infection => 1,
            ExposureType::Vaccination => 2,
            ExposureType::Adjuvant => 3,
            ExposureType::Modifier => 4,
            ExposureType::Other(id) => *id,
        }
    }

    /// 0-based index of the kinetics parameter block for this type
    pub fn block(&self) -> usize {
        self.id() - 1
    }
}

/// The flattened, block-encoded description of a study design
///
/// Per-row arrays (`exposure_types`, `exposure_strains`, `measured_strains`, `exposure_orders`,
/// `exposure_primes`) are aligned with the parameter vector. All `*_indices` hold 0-based
/// positions, all ids (groups, strains, types, orders) are 1-based.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlatDesign {
    pub groups: Vec<usize>,
    pub individuals: Vec<usize>,
    pub strains: Vec<usize>,
    pub exposure_types: Vec<usize>,
    pub exposure_strains: Vec<usize>,
    pub measured_strains: Vec<usize>,
    pub exposure_orders: Vec<usize>,
    pub exposure_primes: Vec<usize>,
    pub exposure_indices: Vec<usize>,
    pub cr_indices: Vec<usize>,
    pub par_type_indices: Vec<usize>,
    pub order_indices: Vec<usize>,
    pub exposure_lengths: Vec<usize>,
    pub par_lengths: Vec<usize>,
    pub cr_lengths: Vec<usize>,
}

/// A single resolved exposure event
#[derive(Debug, Clone, PartialEq)]
pub struct Exposure {
    /// Position of the infection time in the parameter vector
    pub time_index: usize,
    pub order: ExposureOrder,
    pub strain: StrainId,
    pub kind: ExposureType,
    /// Priming value, passed to the solver as given (usually 0 or 1)
    pub primed: f64,
    /// Position of the order modifier in the parameter vector
    pub modifier_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: usize,
    pub individuals: usize,
    pub exposures: Vec<Exposure>,
}

/// One (group, measured strain) pair, i.e. one row of the results matrix
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// Index into [Design::groups]
    pub group: usize,
    pub strain: StrainId,
    /// First row of the observed data consumed by this cell
    pub first_row: usize,
    /// Cross-reactivity parameter position for each exposure of the group, in exposure order
    pub cross_reactivity: Vec<usize>,
}

impl Cell {
    /// Observed data rows belonging to this cell, one per individual
    pub fn rows(&self, design: &Design) -> Range<usize> {
        self.first_row..self.first_row + design.groups[self.group].individuals
    }
}

/// Study design with every block decoded and every index checked
#[derive(Debug, Clone)]
pub struct Design {
    groups: Vec<Group>,
    strains: Vec<StrainId>,
    kinetics: Vec<Vec<usize>>,
    cells: Vec<Cell>,
    n_parameters: usize,
    n_rows: usize,
}

impl Design {
    /// Decode a [FlatDesign] against a parameter vector of length `n_parameters`
    pub fn resolve(flat: &FlatDesign, n_parameters: usize) -> Result<Self> {
        ensure!(
            flat.groups.len() == flat.individuals.len(),
            "{} groups were given, but individuals are counted for {}",
            flat.groups.len(),
            flat.individuals.len()
        );
        for (name, array) in [
            ("exposure_types", &flat.exposure_types),
            ("exposure_strains", &flat.exposure_strains),
            ("measured_strains", &flat.measured_strains),
            ("exposure_orders", &flat.exposure_orders),
            ("exposure_primes", &flat.exposure_primes),
        ] {
            ensure!(
                array.len() == n_parameters,
                "{} has length {}, expected one entry per parameter ({})",
                name,
                array.len(),
                n_parameters
            );
        }
        let check_parameter = |name: &str, index: usize| -> Result<usize> {
            ensure!(
                index < n_parameters,
                "{} refers to parameter {}, but only {} parameters exist",
                name,
                index,
                n_parameters
            );
            Ok(index)
        };

        let strains = flat
            .strains
            .iter()
            .map(|&id| StrainId::from_id(id))
            .collect::<Result<Vec<_>>>()
            .wrap_err("Invalid measured strain")?;

        // Kinetics parameter blocks, one per exposure type
        let n_types = flat.par_lengths.len().saturating_sub(1);
        let mut kinetics = Vec::with_capacity(n_types);
        for block in 0..n_types {
            let range = checked_block_range(&flat.par_lengths, block, flat.par_type_indices.len())
                .wrap_err("Invalid parameter type blocks")?;
            let indices = flat.par_type_indices[range]
                .iter()
                .map(|&index| check_parameter("par_type_indices", index))
                .collect::<Result<Vec<_>>>()?;
            kinetics.push(indices);
        }

        let mut groups = Vec::with_capacity(flat.groups.len());
        for (i, (&id, &individuals)) in flat.groups.iter().zip(&flat.individuals).enumerate() {
            let range = checked_block_range(&flat.exposure_lengths, i, flat.exposure_indices.len())
                .wrap_err_with(|| format!("Invalid exposure block for group {}", id))?;
            let exposures = flat.exposure_indices[range]
                .iter()
                .map(|&row| resolve_exposure(flat, row, n_parameters, &kinetics))
                .collect::<Result<Vec<_>>>()
                .wrap_err_with(|| format!("Invalid exposure in group {}", id))?;
            groups.push(Group {
                id,
                individuals,
                exposures,
            });
        }

        // Cells in evaluation order, with the data cursor precomputed
        let mut cells = Vec::with_capacity(groups.len() * strains.len());
        let mut cursor = 0;
        for (g, group) in groups.iter().enumerate() {
            for strain in &strains {
                let block = checked_block_range(&flat.cr_lengths, strain.index(), flat.cr_indices.len())
                    .wrap_err_with(|| format!("Invalid cross-reactivity block for strain {}", strain))?;
                let cross_reactivity = group
                    .exposures
                    .iter()
                    .map(|exposure| {
                        let position = block.start + exposure.strain.index();
                        ensure!(
                            position < block.end,
                            "No cross-reactivity term for exposure strain {} against measured strain {}",
                            exposure.strain,
                            strain
                        );
                        check_parameter("cr_indices", flat.cr_indices[position])
                    })
                    .collect::<Result<Vec<_>>>()?;
                cells.push(Cell {
                    group: g,
                    strain: *strain,
                    first_row: cursor,
                    cross_reactivity,
                });
                cursor += group.individuals;
            }
        }

        tracing::debug!(
            "Resolved design with {} groups, {} strains, {} exposure types and {} data rows",
            groups.len(),
            strains.len(),
            kinetics.len(),
            cursor
        );

        Ok(Design {
            groups,
            strains,
            kinetics,
            cells,
            n_parameters,
            n_rows: cursor,
        })
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn strains(&self) -> &[StrainId] {
        &self.strains
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Parameter positions of the kinetics block for an exposure type
    pub fn kinetics(&self, kind: ExposureType) -> &[usize] {
        &self.kinetics[kind.block()]
    }

    /// Length of the parameter vector this design was resolved against
    pub fn n_parameters(&self) -> usize {
        self.n_parameters
    }

    /// Number of observed data rows the design expects
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }
}

fn resolve_exposure(
    flat: &FlatDesign,
    row: usize,
    n_parameters: usize,
    kinetics: &[Vec<usize>],
) -> Result<Exposure> {
    ensure!(
        row < n_parameters,
        "Exposure refers to parameter {}, but only {} parameters exist",
        row,
        n_parameters
    );
    let order = ExposureOrder::from_id(flat.exposure_orders[row])?;
    let modifier_index = *flat.order_indices.get(order.index()).ok_or_else(|| {
        eyre::eyre!(
            "No order modifier for exposure order {} ({} available)",
            order.id(),
            flat.order_indices.len()
        )
    })?;
    ensure!(
        modifier_index < n_parameters,
        "order_indices refers to parameter {}, but only {} parameters exist",
        modifier_index,
        n_parameters
    );
    let kind = ExposureType::from_id(flat.exposure_types[row])?;
    ensure!(
        kind.block() < kinetics.len(),
        "Exposure type {} has no kinetics parameter block ({} defined)",
        kind.id(),
        kinetics.len()
    );
    Ok(Exposure {
        time_index: row,
        order,
        strain: StrainId::from_id(flat.exposure_strains[row])?,
        kind,
        primed: flat.exposure_primes[row] as f64,
        modifier_index,
    })
}
