//! Structural verification of the editor document
//!
//! The verifier reads the live document on its own and never looks at what
//! the executor did, so a step that claims success is still checked.

use crate::error::Result;
use crate::query::ElementQuery;
use crate::session::Session;
use prosecheck_core::{CheckError, ListSignature};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which list nodes to look for, and where
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationQuery {
    /// Editor root every list must sit under
    pub root: ElementQuery,
    pub ordered: ElementQuery,
    pub bulleted: ElementQuery,
}

impl VerificationQuery {
    /// `ol` and `ul` nodes under the editor root
    pub fn lists_under(root: ElementQuery) -> Self {
        Self {
            ordered: ElementQuery::tag("ol").within(root.clone()),
            bulleted: ElementQuery::tag("ul").within(root.clone()),
            root,
        }
    }
}

/// Reads the document structure into a [`ListSignature`]
pub struct StateVerifier<'a> {
    session: &'a dyn Session,
}

impl<'a> StateVerifier<'a> {
    pub fn new(session: &'a dyn Session) -> Self {
        Self { session }
    }

    /// Classify the current document
    ///
    /// A missing editor root or an unreadable node is a
    /// [`CheckError::Verification`], so the case ends inconclusive rather
    /// than failed. Transport failures propagate unchanged and end the run.
    pub async fn verify(&self, query: &VerificationQuery) -> Result<ListSignature> {
        let roots = self.count(&query.root).await?;
        if roots == 0 {
            return Err(CheckError::Verification(format!(
                "Editor root {} not found",
                query.root
            )));
        }

        let ordered = self.count(&query.ordered).await?;
        let bulleted = self.count(&query.bulleted).await?;
        let signature = ListSignature::new(ordered > 0, bulleted > 0);

        debug!(
            "Document has {} ordered and {} bullet lists: {}",
            ordered, bulleted, signature
        );
        Ok(signature)
    }

    async fn count(&self, query: &ElementQuery) -> Result<usize> {
        match self.session.count(query).await {
            Ok(count) => Ok(count),
            Err(e) if e.is_recoverable() => Err(CheckError::Verification(format!(
                "Counting {} failed: {}",
                query, e
            ))),
            Err(e) => Err(e),
        }
    }
}
