use crate::domain::model::{CompanyId, PageOrderConditionQuery};
use crate::domain::ports::OrderPermissionsVerifier;
use crate::utils::error::{OmsError, Result};
use async_trait::async_trait;
use std::collections::HashSet;

/// 限制單頁查詢數量
pub struct PageSizeVerifier {
    max_page_size: u32,
}

impl PageSizeVerifier {
    pub fn new(max_page_size: u32) -> Self {
        Self { max_page_size }
    }
}

#[async_trait]
impl OrderPermissionsVerifier for PageSizeVerifier {
    fn name(&self) -> &str {
        "page_size"
    }

    async fn check(&self, _company_id: CompanyId, condition: &PageOrderConditionQuery) -> Result<()> {
        if condition.page_size == 0 || condition.page_size > self.max_page_size {
            return Err(OmsError::PermissionDenied {
                verifier: self.name().to_string(),
                reason: format!(
                    "page size {} outside 1..={}",
                    condition.page_size, self.max_page_size
                ),
            });
        }
        Ok(())
    }
}

/// 公司訪問權限，允許列表為空時不做限制
pub struct CompanyAccessVerifier {
    allowed: HashSet<CompanyId>,
}

impl CompanyAccessVerifier {
    pub fn new(allowed: HashSet<CompanyId>) -> Self {
        Self { allowed }
    }
}

#[async_trait]
impl OrderPermissionsVerifier for CompanyAccessVerifier {
    fn name(&self) -> &str {
        "company_access"
    }

    async fn check(&self, company_id: CompanyId, _condition: &PageOrderConditionQuery) -> Result<()> {
        if !self.allowed.is_empty() && !self.allowed.contains(&company_id) {
            return Err(OmsError::PermissionDenied {
                verifier: self.name().to_string(),
                reason: format!("company {} has no access to order queries", company_id),
            });
        }
        Ok(())
    }
}
