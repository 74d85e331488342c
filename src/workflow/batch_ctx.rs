//! 批次处理上下文
//!
//! 封装"我正在处理第几批、哪几行"这一信息

use std::fmt::Display;

/// 批次处理上下文
#[derive(Debug, Clone)]
pub struct BatchCtx {
    /// 批次编号（从1开始）
    pub batch_num: usize,

    /// 批次总数
    pub total_batches: usize,

    /// 本批第一行在选择结果中的位置（从1开始）
    pub first_row: usize,

    /// 本批最后一行的位置
    pub last_row: usize,

    /// 选择结果总行数
    pub total_rows: usize,
}

impl BatchCtx {
    /// 根据批次起点计算上下文
    pub fn new(batch_start: usize, batch_len: usize, batch_size: usize, total_rows: usize) -> Self {
        Self {
            batch_num: batch_start / batch_size + 1,
            total_batches: (total_rows + batch_size - 1) / batch_size,
            first_row: batch_start + 1,
            last_row: batch_start + batch_len,
            total_rows,
        }
    }

    pub fn is_last(&self) -> bool {
        self.batch_num >= self.total_batches
    }
}

impl Display for BatchCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[批次 {}/{}]", self.batch_num, self.total_batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ctx_for_last_partial_batch() {
        let ctx = BatchCtx::new(20, 3, 10, 23);
        assert_eq!(ctx.batch_num, 3);
        assert_eq!(ctx.total_batches, 3);
        assert_eq!((ctx.first_row, ctx.last_row), (21, 23));
        assert!(ctx.is_last());
        assert_eq!(ctx.to_string(), "[批次 3/3]");
    }
}
