use crate::core::forcefield::damping::PolarizationDamping;
use crate::core::forcefield::multipole::{
    DipoleInteraction, charge_dipole, dipole_dipole, dipole_quadrupole,
};
use crate::core::models::points::PolarizablePoint;
use crate::core::models::system::FragmentSystem;
use crate::engine::accumulator::GradientAccumulator;
use crate::engine::context::PolarizationContext;
use crate::engine::window::PairWindow;
use nalgebra::{Point3, Vector3};
use tracing::{debug, instrument};

#[cfg(feature = "parallel")]
use crate::engine::partition::FRAGMENTS_PER_TASK;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Accumulates the polarization gradient from converged dipoles.
///
/// Fragments are processed block by block; within a block every worker fills its own accumulator
/// and the partials are merged by reduction.
#[instrument(skip_all, name = "polarization_gradient_task")]
pub fn run(system: &FragmentSystem, ctx: &PolarizationContext) -> GradientAccumulator {
    let n_frag = system.len();
    let n_ptc = system.point_charges().len();
    let empty = || GradientAccumulator::new(n_frag, n_ptc);

    let mut total = empty();

    for block in ctx.partition.blocks() {
        #[cfg(feature = "parallel")]
        let partial = block
            .into_par_iter()
            .with_max_len(FRAGMENTS_PER_TASK)
            .fold(empty, |mut acc, i| {
                accumulate_fragment(&mut acc, system, ctx, i);
                acc
            })
            .reduce(empty, GradientAccumulator::merge);

        #[cfg(not(feature = "parallel"))]
        let partial = block.fold(empty(), |mut acc, i| {
            accumulate_fragment(&mut acc, system, ctx, i);
            acc
        });

        total = total.merge(partial);
    }

    debug!(fragments = n_frag, "Polarization gradient accumulated.");
    total
}

fn accumulate_fragment(
    acc: &mut GradientAccumulator,
    system: &FragmentSystem,
    ctx: &PolarizationContext,
    frag_idx: usize,
) {
    for pt in system.fragments()[frag_idx].polarizable_points() {
        accumulate_point(acc, system, ctx, frag_idx, pt);
    }
}

/// Sites of one damped, switched interaction between a dipole on fragment `i` and a source on
/// fragment `j`.
struct PairSites<'a> {
    i: usize,
    j: usize,
    center_i: &'a Point3<f64>,
    center_j: &'a Point3<f64>,
    window: &'a PairWindow,
    damping: PolarizationDamping,
}

impl PairSites<'_> {
    /// Adds one interaction term and returns its damped, unswitched energy.
    fn add(
        &self,
        acc: &mut GradientAccumulator,
        site: &Point3<f64>,
        source: &Point3<f64>,
        term: impl FnOnce(&Vector3<f64>) -> DipoleInteraction,
    ) -> f64 {
        let r = self.window.displacement(site, source);
        let damp = self.damping.factors(r.norm());
        let interaction = term(&r);

        let s = self.window.swf;
        let grad = (interaction.grad * damp.p1 - r * (damp.p2 * interaction.energy)) * s;
        let torque_i = interaction.torque_dipole * (damp.p1 * s);
        let torque_j = interaction.torque_source * (damp.p1 * s);

        acc.add_site_gradient(self.i, self.center_i, site, &grad, &torque_i);
        acc.add_site_gradient(self.j, self.center_j, source, &-grad, &torque_j);
        acc.add_stress(&self.window.dr, &grad);

        damp.p1 * interaction.energy
    }
}

fn accumulate_point(
    acc: &mut GradientAccumulator,
    system: &FragmentSystem,
    ctx: &PolarizationContext,
    frag_idx: usize,
    pt: &PolarizablePoint,
) {
    let frags = system.fragments();
    let fr_i = &frags[frag_idx];
    let dipole = pt.mean_dipole();
    let half_dipole = pt.induced_dipole * 0.5;

    for (j, fr_j) in frags.iter().enumerate() {
        if j == frag_idx || system.skip_pair(frag_idx, j) {
            continue;
        }

        let window = PairWindow::new(system, ctx.config, frag_idx, j);
        if window.is_out_of_range() {
            continue;
        }

        let sites = PairSites {
            i: frag_idx,
            j,
            center_i: fr_i.position(),
            center_j: fr_j.position(),
            window: &window,
            damping: ctx.config.damping,
        };

        // Energy of the pair before switching, for the switching-gradient term.
        let mut energy = 0.0;

        for atom in fr_j.atoms() {
            energy += sites.add(acc, &pt.position, &atom.position, |r| {
                charge_dipole(atom.znuc, &dipole, r)
            });
        }

        for mult in fr_j.multipole_points() {
            energy += sites.add(acc, &pt.position, &mult.position, |r| {
                charge_dipole(mult.monopole, &dipole, r)
                    + dipole_dipole(&dipole, &mult.dipole, r)
                    + dipole_quadrupole(&dipole, &mult.quadrupole, r)
            });
        }

        for pt_j in fr_j.polarizable_points() {
            energy += sites.add(acc, &pt.position, &pt_j.position, |r| {
                dipole_dipole(&half_dipole, &pt_j.induced_dipole_conj, r)
            });
        }

        let grad = window.dswf * energy;
        acc.add_center_gradient(frag_idx, &grad);
        acc.add_center_gradient(j, &-grad);
        acc.add_stress(&window.dr, &grad);
    }

    if ctx.config.terms.ai_polarization {
        for (k, charge) in system.point_charges().iter().enumerate() {
            let r = pt.position - charge.position;
            let interaction = charge_dipole(charge.charge, &dipole, &r);

            acc.add_site_gradient(
                frag_idx,
                fr_i.position(),
                &pt.position,
                &interaction.grad,
                &interaction.torque_dipole,
            );
            acc.point_charge_grads[k] -= interaction.grad;
        }
    }
}
