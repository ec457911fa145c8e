use settleup_domain::{
    BalanceRow, BalanceStatus, Expense, GroupSummary, Member, MemberId, Money, Settlement,
    SettlementPlan,
};
use std::fmt::Write;

#[derive(Clone, Copy, Default)]
pub enum Alignment {
    #[default]
    Left,
    Right,
}

/// Plain-text table with columns padded to their widest cell.
#[derive(Default)]
pub struct TextTable {
    headers: Vec<&'static str>,
    alignments: Vec<Alignment>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    pub fn new(headers: &[&'static str]) -> Self {
        Self {
            headers: headers.to_vec(),
            alignments: vec![Alignment::default(); headers.len()],
            rows: Vec::new(),
        }
    }

    pub fn alignments(mut self, alignments: &[Alignment]) -> Self {
        self.alignments = alignments.to_vec();
        self
    }

    pub fn row(mut self, row: Vec<String>) -> Self {
        self.rows.push(row);
        self
    }

    pub fn rows(mut self, rows: impl IntoIterator<Item = Vec<String>>) -> Self {
        self.rows.extend(rows);
        self
    }

    pub fn build(self) -> String {
        let mut widths: Vec<usize> = self
            .headers
            .iter()
            .map(|header| header.chars().count())
            .collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        self.write_line(&mut out, self.headers.iter().copied(), &widths);
        let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
        self.write_line(&mut out, rule.iter().map(String::as_str), &widths);
        for row in &self.rows {
            self.write_line(&mut out, row.iter().map(String::as_str), &widths);
        }
        out
    }

    fn write_line<'a>(
        &self,
        out: &mut String,
        cells: impl Iterator<Item = &'a str>,
        widths: &[usize],
    ) {
        let mut line = String::new();
        for (idx, (cell, &width)) in cells.zip(widths).enumerate() {
            if idx > 0 {
                line.push_str("  ");
            }
            let _ = match self.alignments.get(idx).copied().unwrap_or_default() {
                Alignment::Left => write!(line, "{cell:<width$}"),
                Alignment::Right => write!(line, "{cell:>width$}"),
            };
        }
        let _ = writeln!(out, "{}", line.trim_end());
    }
}

fn member_label(members: &[Member], id: MemberId) -> String {
    members
        .iter()
        .find(|member| member.id == id)
        .map(|member| member.name.clone())
        .unwrap_or_else(|| format!("#{id}"))
}

fn signed(amount: Money) -> String {
    if amount.is_positive() {
        format!("+{amount:.2}")
    } else {
        format!("{amount:.2}")
    }
}

fn status_label(status: BalanceStatus) -> &'static str {
    match status {
        BalanceStatus::Owed => "is owed",
        BalanceStatus::Owes => "owes",
        BalanceStatus::Settled => "settled up",
    }
}

pub fn balances_table(rows: &[BalanceRow]) -> String {
    TextTable::new(&["Member", "Paid", "Owed", "Net", "Status"])
        .alignments(&[
            Alignment::Left,
            Alignment::Right,
            Alignment::Right,
            Alignment::Right,
            Alignment::Left,
        ])
        .rows(rows.iter().map(|row| {
            vec![
                row.name.clone(),
                format!("{:.2}", row.total_paid),
                format!("{:.2}", row.total_owed),
                signed(row.net_balance),
                status_label(row.status).to_string(),
            ]
        }))
        .build()
}

pub fn plan_table(members: &[Member], plan: &SettlementPlan) -> String {
    if plan.transfers.is_empty() {
        return "Everyone is settled up.\n".to_string();
    }

    let table = TextTable::new(&["From", "To", "Amount"])
        .alignments(&[Alignment::Left, Alignment::Left, Alignment::Right])
        .rows(plan.transfers.iter().map(|transfer| {
            vec![
                member_label(members, transfer.from),
                member_label(members, transfer.to),
                format!("{:.2}", transfer.amount),
            ]
        }))
        .build();
    format!(
        "{table}Total outstanding: {:.2} across {} transfer(s)\n",
        plan.total_debt,
        plan.transfers.len()
    )
}

pub fn settlements_table(members: &[Member], settlements: &[Settlement]) -> String {
    TextTable::new(&["Id", "From", "To", "Amount", "Status", "Created"])
        .alignments(&[
            Alignment::Right,
            Alignment::Left,
            Alignment::Left,
            Alignment::Right,
            Alignment::Left,
            Alignment::Left,
        ])
        .rows(settlements.iter().map(|settlement| {
            vec![
                settlement.id.to_string(),
                member_label(members, settlement.from),
                member_label(members, settlement.to),
                format!("{:.2}", settlement.amount),
                settlement.status.to_string(),
                settlement.created_at.format("%Y-%m-%d %H:%M").to_string(),
            ]
        }))
        .build()
}

/// One line per expense followed by an indented line per split.
pub fn expenses_table(members: &[Member], expenses: &[Expense]) -> String {
    TextTable::new(&["Date", "Description", "Paid by", "Amount", "Split"])
        .alignments(&[
            Alignment::Left,
            Alignment::Left,
            Alignment::Left,
            Alignment::Right,
            Alignment::Left,
        ])
        .rows(expenses.iter().flat_map(|expense| {
            let header = vec![
                expense.date.format("%Y-%m-%d").to_string(),
                expense.description.clone(),
                member_label(members, expense.paid_by),
                format!("{:.2}", expense.amount),
                expense.split_method.to_string(),
            ];
            let splits = expense.splits.iter().map(move |split| {
                vec![
                    String::new(),
                    format!("  {}", member_label(members, split.member_id)),
                    String::new(),
                    format!("{:.2}", split.owed_amount),
                    String::new(),
                ]
            });
            std::iter::once(header).chain(splits)
        }))
        .build()
}

pub fn summary_text(summary: &GroupSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Members:           {}", summary.member_count);
    let _ = writeln!(out, "Expenses:          {}", summary.expense_count);
    let _ = writeln!(out, "Total spent:       {:.2}", summary.total_expenses);
    let _ = writeln!(out, "Average expense:   {:.2}", summary.average_expense);
    let _ = writeln!(out, "Outstanding:       {:.2}", summary.total_outstanding);
    if let Some(top) = &summary.top_spender {
        let _ = writeln!(
            out,
            "Top spender:       {} ({:.2}, {}%)",
            top.name, top.total, top.share_percent
        );
    }
    if let Some(top) = &summary.top_category {
        let _ = writeln!(out, "Top category:      {} ({:.2})", top.category, top.total);
    }
    out
}
