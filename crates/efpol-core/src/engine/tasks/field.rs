use crate::core::forcefield::multipole::{charge_field, dipole_field, quadrupole_field};
use crate::core::models::system::FragmentSystem;
use crate::engine::context::PolarizationContext;
use crate::engine::error::{CallbackError, EngineError};
use crate::engine::window::PairWindow;
use nalgebra::{Point3, Vector3};
use tracing::{debug, instrument};

/// Computes `elec_field` and `elec_field_wf` on every polarizable point.
///
/// `elec_field` collects the nuclei and permanent multipoles of all other fragments, damped and
/// switched, plus the external point charges when the ab initio term is on. `elec_field_wf` comes
/// from the electron-density callback and is zero without one.
#[instrument(skip_all, name = "static_field_task")]
pub fn run(system: &mut FragmentSystem, ctx: &PolarizationContext) -> Result<(), EngineError> {
    let fields = {
        let system = &*system;
        ctx.partition.gather(|i| {
            system.fragments()[i]
                .polarizable_points()
                .iter()
                .map(|pt| static_field(system, ctx, i, &pt.position))
                .collect()
        })
    };

    let mut fields = fields.into_iter();
    for frag in system.fragments_mut() {
        for pt in frag.polarizable_points_mut() {
            if let Some(field) = fields.next() {
                pt.elec_field = field;
            }
            pt.elec_field_wf = Vector3::zeros();
        }
    }

    if ctx.config.terms.ai_polarization {
        add_electron_density_field(system, ctx)?;
    }

    debug!(
        points = system.n_polarizable_points(),
        "Static field computed."
    );
    Ok(())
}

fn static_field(
    system: &FragmentSystem,
    ctx: &PolarizationContext,
    frag_idx: usize,
    site: &Point3<f64>,
) -> Vector3<f64> {
    let damping = ctx.config.damping;
    let mut field = Vector3::zeros();

    for (j, fr_j) in system.fragments().iter().enumerate() {
        if j == frag_idx || system.skip_pair(frag_idx, j) {
            continue;
        }

        let window = PairWindow::new(system, ctx.config, frag_idx, j);
        if window.is_out_of_range() {
            continue;
        }

        for atom in fr_j.atoms() {
            let r = window.displacement(site, &atom.position);
            field += charge_field(atom.znuc, &r) * (window.swf * damping.value(r.norm()));
        }

        for mult in fr_j.multipole_points() {
            let r = window.displacement(site, &mult.position);
            let multipole = charge_field(mult.monopole, &r)
                + dipole_field(&mult.dipole, &r)
                + quadrupole_field(&mult.quadrupole, &r);
            field += multipole * (window.swf * damping.value(r.norm()));
        }
    }

    if ctx.config.terms.ai_polarization {
        for charge in system.point_charges() {
            field += charge_field(charge.charge, &(site - charge.position));
        }
    }

    field
}

fn add_electron_density_field(
    system: &mut FragmentSystem,
    ctx: &PolarizationContext,
) -> Result<(), EngineError> {
    let Some(density) = ctx.density else {
        return Ok(());
    };

    let positions: Vec<Point3<f64>> = system
        .fragments()
        .iter()
        .flat_map(|f| f.polarizable_points().iter().map(|pt| pt.position))
        .collect();

    let fields = density.field_at(&positions)?;
    if fields.len() != positions.len() {
        return Err(CallbackError::new(format!(
            "electron density field returned {} vectors for {} points",
            fields.len(),
            positions.len()
        ))
        .into());
    }

    let mut fields = fields.into_iter();
    for frag in system.fragments_mut() {
        for pt in frag.polarizable_points_mut() {
            if let Some(field) = fields.next() {
                pt.elec_field_wf = field;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::points::PointCharge;
    use crate::engine::config::{PolarizationConfig, PolarizationConfigBuilder, Terms};
    use crate::engine::partition::Partition;
    use crate::engine::progress::ProgressReporter;
    use crate::fixtures;

    fn ai_config() -> PolarizationConfig {
        PolarizationConfigBuilder::new()
            .terms(Terms {
                polarization: true,
                ai_polarization: true,
            })
            .build()
            .unwrap()
    }

    fn fields(system: &FragmentSystem) -> Vec<Vector3<f64>> {
        system
            .fragments()
            .iter()
            .flat_map(|f| f.polarizable_points().iter().map(|p| p.elec_field))
            .collect()
    }

    #[test]
    fn point_charges_contribute_only_with_ai_term() {
        let partition = Partition::new(2, 1);
        let reporter = ProgressReporter::new();
        let charge = PointCharge {
            position: Point3::new(0.0, -5.0, 0.0),
            charge: 1.0,
        };

        let plain = PolarizationConfig::default();
        let ctx = PolarizationContext::new(&plain, &partition, None, &reporter);
        let mut without = fixtures::two_fragment_system(6.0);
        run(&mut without, &ctx).unwrap();
        let mut with = fixtures::two_fragment_system(6.0);
        with.set_point_charges(vec![charge]);
        run(&mut with, &ctx).unwrap();
        assert_eq!(fields(&without), fields(&with));

        let ai = ai_config();
        let ctx = PolarizationContext::new(&ai, &partition, None, &reporter);
        run(&mut with, &ctx).unwrap();
        let first = &with.fragments()[0].polarizable_points()[0];
        let expected = fields(&without)[0] + charge_field(1.0, &(first.position - charge.position));
        assert!((first.elec_field - expected).norm() < 1e-14);
    }

    #[test]
    fn density_field_with_wrong_length_is_rejected() {
        let config = ai_config();
        let partition = Partition::new(2, 1);
        let reporter = ProgressReporter::new();
        let density =
            |_: &[Point3<f64>]| -> Result<Vec<Vector3<f64>>, CallbackError> { Ok(vec![]) };
        let ctx = PolarizationContext::new(&config, &partition, Some(&density), &reporter);

        let mut system = fixtures::two_fragment_system(6.0);
        assert!(matches!(
            run(&mut system, &ctx),
            Err(EngineError::Callback(_))
        ));
    }

    #[test]
    fn density_field_is_ignored_without_ai_term() {
        let config = PolarizationConfig::default();
        let partition = Partition::new(2, 1);
        let reporter = ProgressReporter::new();
        let density = |_: &[Point3<f64>]| -> Result<Vec<Vector3<f64>>, CallbackError> {
            Err(CallbackError::new("should not be called"))
        };
        let ctx = PolarizationContext::new(&config, &partition, Some(&density), &reporter);

        let mut system = fixtures::two_fragment_system(6.0);
        run(&mut system, &ctx).unwrap();
        assert!(
            system
                .fragments()
                .iter()
                .flat_map(|f| f.polarizable_points())
                .all(|p| p.elec_field_wf == Vector3::zeros())
        );
    }
}
