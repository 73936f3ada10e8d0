use crate::common::{format_display_date, format_money};
use crate::entities::InvoiceStatus;
use crate::services::invoices::InvoiceDocument;

const FOOTER_THANKS: &str = "Thank you for your business";

/// Renders an invoice as a standalone, print-ready HTML page.
pub fn render_invoice(doc: &InvoiceDocument) -> String {
    let invoice = &doc.invoice;
    let request = &doc.request;

    let mut rows = String::new();
    for item in &doc.items {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td></tr>\n",
            esc(&item.description),
            item.quantity,
            format_money(item.unit_price),
            item.line_total().map(format_money).unwrap_or_default(),
        ));
    }

    let body = format!(
        r#"<div class="container">
<div class="header"><h1>Invoice</h1><h2>{invoice_no}</h2></div>
<div class="split">
<div>
<p><strong>Issued:</strong> {issued}</p>
<p><strong>Due:</strong> {due}</p>
</div>
<div>
<p><strong>Request:</strong> {request_no}</p>
<p><strong>Status:</strong> <span class="status {status_class}">{status}</span></p>
</div>
</div>
<div class="split">
<p><strong>Customer:</strong> {customer}</p>
<p><strong>Phone:</strong> {phone}</p>
</div>
<table>
<thead><tr><th>Item</th><th width="15%">Qty</th><th width="20%">Unit price</th><th width="20%">Amount</th></tr></thead>
<tbody>
{rows}</tbody>
<tfoot><tr><td colspan="3" class="num total">Total</td><td class="num total">{total}</td></tr></tfoot>
</table>
<div class="footer"><p>{thanks}</p></div>
<div class="no-print"><button onclick="window.print()">Print invoice</button></div>
</div>"#,
        invoice_no = esc(&invoice.invoice_no),
        issued = format_display_date(invoice.issue_date),
        due = format_display_date(invoice.due_date),
        request_no = esc(&request.request_no),
        status_class = status_class(invoice.status),
        status = invoice.status.label(),
        customer = esc(&request.customer_name),
        phone = esc(&request.customer_phone),
        rows = rows,
        total = format_money(invoice.amount),
        thanks = FOOTER_THANKS,
    );

    html_shell(&format!("Invoice {}", invoice.invoice_no), &body)
}

fn status_class(status: InvoiceStatus) -> &'static str {
    match status {
        InvoiceStatus::Paid => "paid",
        InvoiceStatus::Cancelled => "cancelled",
        InvoiceStatus::Unpaid => "unpaid",
    }
}

fn esc(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn html_shell(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8"/>
<title>{}</title>
<style>
body {{ font-family: 'Segoe UI', Tahoma, sans-serif; background: #f6f8fa; }}
.container {{ max-width: 700px; margin: 20px auto; background: #fff; border-radius: 12px; padding: 20px 32px 32px; }}
.header {{ text-align: center; margin-bottom: 20px; }}
.split {{ display: flex; justify-content: space-between; margin-bottom: 20px; }}
table {{ width: 100%; border-collapse: collapse; margin-bottom: 20px; }}
th, td {{ border: 1px solid #ddd; padding: 8px; text-align: left; }}
th {{ background: #f2f2f2; }}
.num {{ text-align: right; }}
.total {{ font-weight: bold; font-size: 1.2em; }}
.status.paid {{ color: green; }}
.status.cancelled {{ color: red; }}
.status.unpaid {{ color: orange; }}
.footer {{ margin-top: 50px; text-align: center; font-size: 0.9em; color: #666; }}
.no-print {{ margin-top: 20px; text-align: center; }}
@page {{ size: A4; margin: 10mm; }}
@media print {{ body {{ background: #fff; }} .no-print {{ display: none; }} .container {{ margin: 0; padding: 0; }} }}
</style>
</head>
<body>{}</body>
</html>"#,
        esc(title),
        body
    )
}
