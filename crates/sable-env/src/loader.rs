//! Feeding declarations into an environment.

use crate::environment::Environment;
use crate::Result;

/// Supplies parsed declarations to an environment. Implementations
/// typically walk a set of signature files, parse each one, and push the
/// results through [`Environment::insert`].
pub trait Loader {
    /// Pushes every declaration this loader knows about into `env`.
    fn load(&mut self, env: &mut Environment) -> Result<()>;
}
