//! 膨胀阈值消融实验.
//!
//! 在合成的球形病灶上扫描一组最大体积增长百分比,
//! 比较不同大小病灶的实际相对增长与绝对增长.

mod phantom;
mod result;
mod runner;

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .expect("Logger initialization error");

    runner::run(&runner::THRESHOLDS).analyze();
}
