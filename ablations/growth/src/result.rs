//! 实验结果.

use std::io::{self, Write};

use neuro_berry::post_proc::RefineReport;

use crate::phantom::RADII;

const SEP: &str = "--------------------------------------------------------";

/// 将单个阈值下的结果写进 `w` 中.
fn describe_into<W: Write>(threshold: f64, report: &RefineReport, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    writeln!(w, "Max growth {threshold}%:")?;
    writeln!(w, "{S4}radius  steps  initial(ml)  final(ml)  growth(%)  stop")?;
    for (radius, c) in RADII.iter().zip(report.iter()) {
        writeln!(
            w,
            "{S4}{radius:>6}  {:>5}  {:>11.3}  {:>9.3}  {:>9.1}  {:?}",
            c.accepted_steps,
            c.initial_ml,
            c.final_ml,
            c.growth_percent(),
            c.stop
        )?;
    }
    write!(w, "{S4}Initial volume in total: {:.3} ml", report.initial_ml())?;
    Ok(())
}

/// 消融实验最终结果.
pub struct AblationResult {
    data: Vec<(f64, RefineReport)>,
}

impl AblationResult {
    pub fn from_iter<I: IntoIterator<Item = (f64, RefineReport)>>(it: I) -> Self {
        Self {
            data: it.into_iter().collect(),
        }
    }

    /// 分析运行结果.
    pub fn analyze(&self) {
        println!("{SEP}");
        let mut buf = Vec::with_capacity(512);

        for (threshold, report) in self.data.iter() {
            describe_into(*threshold, report, &mut buf).unwrap();
            println!("{}", String::from_utf8_lossy(&buf));
            buf.clear();

            println!("{SEP}");
        }
    }
}
