//! Gate command table
//!
//! Static mapping from (gate, package) to the command line that runs the
//! gate. A missing entry means the gate passes vacuously for that package.

use super::report::GateType;
use crate::router::Package;

/// The command configured for a gate in a package, if any.
pub fn command_for(gate: GateType, package: Package) -> Option<&'static str> {
    use GateType::*;
    use Package::*;

    match (gate, package) {
        (Build, Frontend | Backend | Electron) => Some("npm run build"),
        (Build, Mobile) => Some("npx tsc"),
        (Test, Frontend | Backend | Electron | Mobile) => Some("npm test"),
        (Lint, Frontend | Backend) => Some("npm run lint"),
        _ => None,
    }
}

/// The gates that have a command configured for a package, in run order.
pub fn configured_gates(package: Package) -> Vec<GateType> {
    [GateType::Build, GateType::Test, GateType::Lint]
        .into_iter()
        .filter(|gate| command_for(*gate, package).is_some())
        .collect()
}
