//! Геометрия запуска: сетка блоков и блок потоков

use crate::error::ConfigError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Двумерный размер или координата
///
/// Ось `x` идет по строкам результата, ось `y` по столбцам.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Dim2 {
    pub x: usize,
    pub y: usize,
}

impl Dim2 {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    pub fn area(self) -> usize {
        self.x * self.y
    }

    /// Площадь без паники при переполнении
    pub fn checked_area(self) -> Option<usize> {
        self.x.checked_mul(self.y)
    }
}

impl fmt::Display for Dim2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.x, self.y)
    }
}

impl FromStr for Dim2 {
    type Err = String;

    /// Разбирает `"4x4"` или `"8"` (квадратный блок)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim()
                .parse::<usize>()
                .map_err(|e| format!("неверный размер {:?}: {}", part, e))
        };
        match s.split_once(['x', 'X']) {
            Some((x, y)) => Ok(Self::new(parse(x)?, parse(y)?)),
            None => {
                let side = parse(s)?;
                Ok(Self::new(side, side))
            }
        }
    }
}

/// Координата одного исполнителя внутри геометрии запуска
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerId {
    pub block: Dim2,
    pub thread: Dim2,
    pub block_dim: Dim2,
}

impl WorkerId {
    /// Глобальная координата: `block * block_dim + thread`
    pub fn global(&self) -> Dim2 {
        Dim2::new(
            self.block.x * self.block_dim.x + self.thread.x,
            self.block.y * self.block_dim.y + self.thread.y,
        )
    }
}

/// Сетка блоков и размер блока потоков
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LaunchGeometry {
    pub grid: Dim2,
    pub block: Dim2,
}

impl LaunchGeometry {
    pub fn new(grid: Dim2, block: Dim2) -> Self {
        Self { grid, block }
    }

    /// Минимальная сетка блоков `tile`, покрывающая `extent` по обеим осям
    pub fn covering(extent: Dim2, tile: Dim2) -> Result<Self, ConfigError> {
        if tile.x == 0 || tile.y == 0 {
            return Err(ConfigError::ZeroTile { x: tile.x, y: tile.y });
        }
        let grid = Dim2::new(extent.x.div_ceil(tile.x), extent.y.div_ceil(tile.y));
        Ok(Self { grid, block: tile })
    }

    /// Общее число исполнителей по каждой оси (`global_work_size` в OpenCL)
    pub fn global_size(&self) -> Dim2 {
        Dim2::new(self.grid.x * self.block.x, self.grid.y * self.block.y)
    }

    pub fn worker_count(&self) -> usize {
        self.global_size().area()
    }

    pub fn covers(&self, extent: Dim2) -> bool {
        let global = self.global_size();
        global.x >= extent.x && global.y >= extent.y
    }

    /// Сетка ровно совпадает с размером (без лишних исполнителей)
    pub fn is_exact(&self, extent: Dim2) -> bool {
        self.global_size() == extent
    }

    pub fn block_count(&self) -> usize {
        self.grid.area()
    }

    /// Координата блока по его линейному номеру (x меняется быстрее)
    pub fn block_at(&self, index: usize) -> Dim2 {
        Dim2::new(index % self.grid.x, index / self.grid.x)
    }

    /// Все исполнители одного блока
    pub fn workers_in(&self, block: Dim2) -> impl Iterator<Item = WorkerId> {
        let block_dim = self.block;
        (0..block_dim.y).flat_map(move |ty| {
            (0..block_dim.x).map(move |tx| WorkerId {
                block,
                thread: Dim2::new(tx, ty),
                block_dim,
            })
        })
    }
}

impl fmt::Display for LaunchGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "сетка {} x блок {}", self.grid, self.block)
    }
}
