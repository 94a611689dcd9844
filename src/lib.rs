//! Omniseal - Code Integrity Validator
//!
//! Omniseal decide si un fragmento de código Python no confiable es seguro
//! para reenviar o ejecutar, aplicando análisis estático bajo un presupuesto
//! estricto de tiempo y complejidad. Nunca ejecuta ni evalúa el candidato.
//!
//! # Arquitectura
//!
//! - **Pipeline de chequeos ordenados**: normalización unicode, límites de
//!   tamaño, firmas de ofuscación, análisis del árbol sintáctico con
//!   tree-sitter y listas de denegación semánticas
//! - **Fail-closed**: cualquier timeout o fallo interno se resuelve como
//!   REJECT, nunca como "desconocido"
//! - **Sin estado compartido**: cada validación opera sobre su propia copia;
//!   las validaciones concurrentes no se bloquean entre sí
//!
//! # Módulos Principales
//!
//! - [`validator`] - El pipeline de validación y sus deadlines
//! - [`verdict`] - Códigos de razón y el veredicto ACCEPT/REJECT
//! - [`config`] - Límites configurables con defaults documentados
//!
//! # Ejemplo de Uso
//!
//! ```rust
//! use omniseal::config::ValidatorConfig;
//! use omniseal::validator::CodeIntegrityValidator;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> anyhow::Result<()> {
//! let validator = CodeIntegrityValidator::new(ValidatorConfig::default())?;
//!
//! let verdict = validator.validate("def add(a, b):\n    return a + b\n").await;
//! assert!(verdict.accepted);
//!
//! let verdict = validator.validate("import os\nos.system('rm -rf /')\n").await;
//! assert!(!verdict.accepted);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod logging;
pub mod validator;
pub mod verdict;

pub use config::ValidatorConfig;
pub use validator::CodeIntegrityValidator;
pub use verdict::{RejectReason, Verdict};
