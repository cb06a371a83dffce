//! 候选图像块的选取.
//!
//! 非阴性切片使用全部候选坐标 (之后交由 [`crate::relevance`] 筛选);
//! 阴性切片没有标注, 只能从候选坐标中不放回地随机抽取固定个数.

use crate::{Error, Result, Stage};
use log::{debug, warn};
use rand::Rng;
use std::collections::HashSet;

/// 从 `[0, total)` 中不放回、均匀地选出 `count` 个互不相同的下标.
///
/// 返回顺序为被接受的顺序, 并不排序. `count > total` 时返回 [`Error::SampleTooLarge`].
///
/// 当 `count <= total / 2` 时使用拒绝采样 (期望抽取次数不超过 `2 * count`);
/// 否则使用部分 Fisher–Yates 洗牌, 因此 `count == total` 时同样可以结束.
pub fn select_random<R: Rng + ?Sized>(total: usize, count: usize, rng: &mut R) -> Result<Vec<usize>> {
    if count > total {
        return Err(Error::SampleTooLarge { total, count });
    }
    if count <= total / 2 {
        let mut seen = HashSet::with_capacity(count);
        let mut ans = Vec::with_capacity(count);
        while ans.len() < count {
            let i = rng.gen_range(0..total);
            if seen.insert(i) {
                ans.push(i);
            }
        }
        Ok(ans)
    } else {
        let mut pool: Vec<usize> = (0..total).collect();
        for i in 0..count {
            let j = rng.gen_range(i..total);
            pool.swap(i, j);
        }
        pool.truncate(count);
        Ok(pool)
    }
}

/// 阴性图像块的预算.
///
/// 总预算 `nc` 被平均分给 `nwn` 张阴性切片, 每张切片 `nc / nwn` 个 (向下取整).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct NegativeBudget {
    /// 阴性切片分组个数, 必须大于 0.
    pub nwn: u32,

    /// 阴性图像块总预算.
    pub nc: u32,
}

impl NegativeBudget {
    /// 创建预算. `nwn == 0` 时返回 [`Error::Config`].
    pub fn new(nwn: u32, nc: u32) -> Result<Self> {
        if nwn == 0 {
            return Err(Error::Config("`nwn` must be positive".to_string()));
        }
        Ok(Self { nwn, nc })
    }

    /// 每张阴性切片的图像块个数.
    #[inline]
    pub fn per_slide(&self) -> usize {
        (self.nc / self.nwn) as usize
    }

    /// 整除后被舍弃的个数.
    #[inline]
    pub fn remainder(&self) -> u32 {
        self.nc % self.nwn
    }
}

/// 为分期为 `stage`、共有 `total` 个候选坐标的切片选取下标.
///
/// - 非阴性: `0..total`, 全部保留;
/// - 阴性: 随机选出 `min(budget.per_slide(), total)` 个. 候选数不足时记录警告.
pub fn select_for_stage<R: Rng + ?Sized>(
    stage: &Stage,
    total: usize,
    budget: &NegativeBudget,
    rng: &mut R,
) -> Result<Vec<usize>> {
    if !stage.is_negative() {
        return Ok((0..total).collect());
    }
    let wanted = budget.per_slide();
    if budget.remainder() != 0 {
        debug!(
            "nc = {} is not divisible by nwn = {}, {} patches dropped per budget",
            budget.nc,
            budget.nwn,
            budget.remainder()
        );
    }
    let count = if wanted > total {
        warn!("only {total} candidates for a negative slide, {wanted} wanted");
        total
    } else {
        wanted
    };
    select_random(total, count, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn check_distinct(v: &[usize], total: usize, count: usize) {
        assert_eq!(v.len(), count);
        assert!(v.iter().all(|&i| i < total));
        let set: HashSet<usize> = v.iter().copied().collect();
        assert_eq!(set.len(), count);
    }

    #[test]
    fn test_select_random_grid() {
        let mut rng = StdRng::seed_from_u64(7);
        for total in 0..24 {
            for count in 0..=total {
                let v = select_random(total, count, &mut rng).unwrap();
                check_distinct(&v, total, count);
            }
        }
    }

    #[test]
    fn test_select_all() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut v = select_random(1000, 1000, &mut rng).unwrap();
        v.sort_unstable();
        assert!(v.into_iter().eq(0..1000));
    }

    #[test]
    fn test_too_many() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            select_random(3, 4, &mut rng).unwrap_err(),
            Error::SampleTooLarge { total: 3, count: 4 }
        ));
    }

    #[test]
    fn test_same_seed_same_selection() {
        let a = select_random(500, 40, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = select_random(500, 40, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_budget() {
        assert!(NegativeBudget::new(0, 100).is_err());

        let b = NegativeBudget::new(2, 100).unwrap();
        assert_eq!(b.per_slide(), 50);
        assert_eq!(b.remainder(), 0);

        // 向下取整, 余数被舍弃
        let b = NegativeBudget::new(3, 100).unwrap();
        assert_eq!(b.per_slide(), 33);
        assert_eq!(b.remainder(), 1);
    }

    #[test]
    fn test_select_for_stage() {
        let mut rng = StdRng::seed_from_u64(1);
        let budget = NegativeBudget::new(2, 100).unwrap();

        let v = select_for_stage(&Stage::Macro, 5, &budget, &mut rng).unwrap();
        assert_eq!(v, [0, 1, 2, 3, 4]);

        let v = select_for_stage(&Stage::Negative, 400, &budget, &mut rng).unwrap();
        check_distinct(&v, 400, 50);

        // 候选不足时退化为全部
        let v = select_for_stage(&Stage::Negative, 20, &budget, &mut rng).unwrap();
        check_distinct(&v, 20, 20);

        let v = select_for_stage(&Stage::Negative, 0, &budget, &mut rng).unwrap();
        assert!(v.is_empty());
    }
}
