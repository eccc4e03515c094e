use crate::domain::message::ChatRequest;
use crate::domain::model::RecordSet;
use crate::utils::error::Result;
use async_trait::async_trait;

/// 唯讀的資料表來源；查詢失敗一律降級，不讓頁面崩潰
pub trait TableSource {
    fn table_exists(&self, table: &str) -> bool;

    /// 資料表不存在或查詢失敗時回傳空陣列
    fn columns(&self, table: &str) -> Vec<String>;

    /// 資料表不存在或查詢失敗時回傳 0
    fn row_count(&self, table: &str) -> usize;

    fn load(&self, table: &str) -> Result<RecordSet>;
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String>;

    /// 逐段回呼 `on_fragment`，串流正常結束後回傳完整回覆
    async fn stream(
        &self,
        request: &ChatRequest,
        on_fragment: &mut (dyn for<'f> FnMut(&'f str) + Send),
    ) -> Result<String>;
}
