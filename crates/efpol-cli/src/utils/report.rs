use efpol::core::forcefield::term::EnergyTerm;
use efpol::core::models::system::FragmentSystem;
use efpol::engine::progress::{OptimizationSnapshot, SnapshotStage};
use efpol::workflows::energy::PolarizationGradient;
use std::fmt::Write;

pub fn format_energy(energy: &EnergyTerm) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "    {:<32}{:>18.10}", "POLARIZATION ENERGY", energy.polarization);
    let _ = writeln!(
        out,
        "    {:<32}{:>18.10}",
        "AI POLARIZATION ENERGY", energy.ai_polarization
    );
    let _ = writeln!(out, "    {:<32}{:>18.10}", "TOTAL ENERGY", energy.total());
    out
}

/// Per-fragment force and torque rows, point-charge gradients and the stress tensor.
pub fn format_gradient(system: &FragmentSystem, gradient: &PolarizationGradient) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "    FRAGMENT GRADIENT (gx gy gz tx ty tz)");
    for (k, (name, g)) in system
        .fragment_names()
        .zip(gradient.fragments.chunks(6))
        .enumerate()
    {
        let _ = writeln!(
            out,
            "    {:>4} {:<10}{:>14.8}{:>14.8}{:>14.8}{:>14.8}{:>14.8}{:>14.8}",
            k + 1,
            name,
            g[0],
            g[1],
            g[2],
            g[3],
            g[4],
            g[5]
        );
    }

    if !gradient.point_charges.is_empty() {
        let _ = writeln!(out, "    POINT CHARGE GRADIENT");
        for (k, g) in gradient.point_charges.iter().enumerate() {
            let _ = writeln!(out, "    {:>4} {:>14.8}{:>14.8}{:>14.8}", k + 1, g.x, g.y, g.z);
        }
    }

    let _ = writeln!(out, "    STRESS TENSOR");
    for row in gradient.stress.row_iter() {
        let _ = writeln!(out, "    {:>14.8}{:>14.8}{:>14.8}", row[0], row[1], row[2]);
    }
    out
}

/// Restart coordinates written as `[[fragment]]` entries that can be pasted into a job file.
pub fn format_restart(restart: &[(String, [f64; 6])]) -> String {
    let mut out = String::new();
    for (name, c) in restart {
        let _ = writeln!(out, "[[fragment]]");
        let _ = writeln!(out, "name = \"{}\"", name);
        let _ = writeln!(
            out,
            "coordinates = [{:.10}, {:.10}, {:.10}, {:.10}, {:.10}, {:.10}]",
            c[0], c[1], c[2], c[3], c[4], c[5]
        );
        out.push('\n');
    }
    out
}

pub fn format_snapshot(snapshot: &OptimizationSnapshot) -> String {
    let mut out = String::new();
    let title = match snapshot.stage {
        SnapshotStage::Initial => "INITIAL STATE".to_string(),
        SnapshotStage::Step(step) => format!("STATE AFTER {} STEPS", step),
        SnapshotStage::Final => "FINAL STATE".to_string(),
    };
    let _ = writeln!(out, "    ==== {} ====", title);

    let _ = writeln!(out, "    GEOMETRY (BOHR)");
    for (label, p) in &snapshot.geometry {
        let _ = writeln!(out, "    {:<12}{:>14.8}{:>14.8}{:>14.8}", label, p.x, p.y, p.z);
    }

    let _ = writeln!(out, "    RESTART DATA");
    for line in format_restart(&snapshot.restart).lines() {
        let _ = writeln!(out, "    {}", line);
    }

    out.push_str(&format_energy(&snapshot.energy));
    let _ = writeln!(out, "    {:<32}{:>18.10}", "ENERGY CHANGE", snapshot.energy_change);
    let _ = writeln!(out, "    {:<32}{:>18.10}", "RMS GRADIENT", snapshot.rms_gradient);
    let _ = writeln!(out, "    {:<32}{:>18.10}", "MAXIMUM GRADIENT", snapshot.max_gradient);
    out
}
